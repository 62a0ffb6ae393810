use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub payment_method: String,
    /// Encrypted with the field cipher.
    #[sea_orm(column_type = "Text", nullable)]
    pub card_number: Option<String>,
    /// Encrypted with the field cipher.
    #[sea_orm(column_type = "Text", nullable)]
    pub card_cvv: Option<String>,
    pub billing_day: i32,
    pub payment_status: String,
    pub next_billing_date: DateTimeWithTimeZone,
    pub amount: f64,
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customers::Entity",
        from = "Column::CustomerId",
        to = "super::customers::Column::Id"
    )]
    Customers,
}

impl Related<super::customers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
