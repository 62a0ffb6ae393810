pub mod customers;
pub mod guardians;
pub mod physical_products;
pub mod products;
pub mod sales;
pub mod service_products;
pub mod subscriptions;
pub mod users;

pub use customers::Entity as Customers;
pub use guardians::Entity as Guardians;
pub use physical_products::Entity as PhysicalProducts;
pub use products::Entity as Products;
pub use sales::Entity as Sales;
pub use service_products::Entity as ServiceProducts;
pub use subscriptions::Entity as Subscriptions;
pub use users::Entity as Users;
