use uuid::Uuid;

use crate::domain::repository::UserRepository;
use crate::domain::types::User;
use crate::error::DetectorError;

pub struct GetProfileUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> GetProfileUseCase<U> {
    pub async fn execute(&self, user_id: Uuid) -> Result<User, DetectorError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(DetectorError::NotFound)
    }
}
