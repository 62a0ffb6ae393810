use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse},
        customers::{
            CreateCustomerRequest, CustomerBasicList, CustomerInput, CustomerList, GuardianInput,
            UpdateCustomerRequest,
        },
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        sales::{CreateSaleRequest, SaleList, UpdateSaleRequest},
        subscriptions::{CreateSubscriptionRequest, SubscriptionList, UpdateSubscriptionRequest},
        users::{CreateUserRequest, UpdateUserRequest, UserList},
    },
    models::{
        Customer, CustomerBasic, Gender, Guardian, PaymentMethod, PaymentStatus, Product,
        ProductDetails, ProductKind, Sale, Subscription, User,
    },
    response::{ApiResponse, Meta},
    routes::{auth, customers, health, params, products, sales, subscriptions, users},
    security::Role,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::generate_token,
        customers::list_customers,
        customers::list_customers_basic,
        customers::get_customer,
        customers::create_customer,
        customers::update_customer,
        customers::delete_customer,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        sales::list_sales,
        sales::get_sale,
        sales::create_sale,
        sales::update_sale,
        sales::delete_sale,
        subscriptions::list_subscriptions,
        subscriptions::get_subscription,
        subscriptions::create_subscription,
        subscriptions::update_subscription,
        subscriptions::cancel_subscription,
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user
    ),
    components(
        schemas(
            Role,
            User,
            Gender,
            Guardian,
            Customer,
            CustomerBasic,
            ProductKind,
            ProductDetails,
            Product,
            PaymentMethod,
            PaymentStatus,
            Sale,
            Subscription,
            LoginRequest,
            LoginResponse,
            CustomerInput,
            GuardianInput,
            CreateCustomerRequest,
            UpdateCustomerRequest,
            CustomerList,
            CustomerBasicList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CreateSaleRequest,
            UpdateSaleRequest,
            SaleList,
            CreateSubscriptionRequest,
            UpdateSubscriptionRequest,
            SubscriptionList,
            CreateUserRequest,
            UpdateUserRequest,
            UserList,
            params::Pagination,
            params::SortOrder,
            params::ProductSortBy,
            Meta,
            ApiResponse<Customer>,
            ApiResponse<Product>,
            ApiResponse<Sale>,
            ApiResponse<Subscription>,
            ApiResponse<User>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Customers", description = "Customers and their guardians"),
        (name = "Products", description = "Physical goods and service plans"),
        (name = "Sales", description = "Sale records"),
        (name = "Subscriptions", description = "Recurring billing"),
        (name = "Users", description = "Back office accounts, superadmin only"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
