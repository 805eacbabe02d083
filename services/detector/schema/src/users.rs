use sea_orm::entity::prelude::*;

/// Account record: identity, plan state and the credit balance.
///
/// `credits` carries a `CHECK (credits >= 0)` constraint; every write to it goes
/// through a conditional UPDATE in the ledger.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    /// Absent for OAuth-only accounts.
    pub password_hash: Option<String>,
    pub plan: String,
    pub role: String,
    pub credits: i32,
    pub credits_reset_at: chrono::DateTime<chrono::Utc>,
    pub email_verified: bool,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub current_period_end: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::analyses::Entity")]
    Analyses,
}

impl Related<super::analyses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Analyses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
