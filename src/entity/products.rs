use sea_orm::entity::prelude::*;

/// Fields shared by every product kind. The kind specific columns live in
/// `physical_products` or `service_products`, keyed by the product id.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub kind: String,
    pub status: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::physical_products::Entity")]
    PhysicalProducts,
    #[sea_orm(has_one = "super::service_products::Entity")]
    ServiceProducts,
    #[sea_orm(has_many = "super::sales::Entity")]
    Sales,
}

impl Related<super::physical_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PhysicalProducts.def()
    }
}

impl Related<super::service_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceProducts.def()
    }
}

impl Related<super::sales::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
