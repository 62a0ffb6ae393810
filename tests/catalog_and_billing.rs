mod common;

use chrono::{TimeZone, Utc};
use common::{auth_user, customer, date, setup_state};
use gym_members_api::{
    dto::{
        products::{CreateProductRequest, UpdateProductRequest},
        sales::{CreateSaleRequest, UpdateSaleRequest},
        subscriptions::{CreateSubscriptionRequest, UpdateSubscriptionRequest},
    },
    entity::{PhysicalProducts, ServiceProducts, Subscriptions},
    error::AppError,
    models::{PaymentMethod, PaymentStatus, Product, ProductDetails, ProductKind},
    routes::params::{Pagination, ProductQuery, SubscriptionQuery},
    security::Role,
    services::{product_service, sale_service, subscription_service},
    state::AppState,
};
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;

fn monthly_plan() -> CreateProductRequest {
    CreateProductRequest {
        name: "Monthly Plan".into(),
        description: "Unlimited access".into(),
        price: 129.0,
        status: true,
        details: ProductDetails::Service {
            duration_months: 1,
            recurring: true,
            benefits: Some("Group classes".into()),
        },
    }
}

fn shaker() -> CreateProductRequest {
    CreateProductRequest {
        name: "Shaker".into(),
        description: "700ml".into(),
        price: 35.0,
        status: true,
        details: ProductDetails::Physical {
            sku: "SHAKER-700".into(),
            stock: 20,
            size: None,
            color: Some("black".into()),
            weight: Some(0.2),
        },
    }
}

async fn create(state: &AppState, payload: CreateProductRequest) -> anyhow::Result<Product> {
    let admin = auth_user(Role::Admin);
    Ok(product_service::create_product(state, &admin, payload)
        .await?
        .data
        .expect("product"))
}

#[tokio::test]
async fn products_keep_their_variant_rows() -> anyhow::Result<()> {
    let (state, _) = setup_state().await?;
    let admin = auth_user(Role::Admin);
    let plan = create(&state, monthly_plan()).await?;
    let item = create(&state, shaker()).await?;

    assert_eq!(plan.details.kind(), ProductKind::Service);
    assert_eq!(PhysicalProducts::find().count(&state.orm).await?, 1);
    assert_eq!(ServiceProducts::find().count(&state.orm).await?, 1);

    let fetched = product_service::get_product(&state, &admin, item.id)
        .await?
        .data
        .expect("product");
    assert_eq!(fetched.details, item.details);

    let services = product_service::list_products(
        &state,
        &admin,
        Pagination::default(),
        ProductQuery {
            kind: Some(ProductKind::Service),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("list");
    assert_eq!(services.items.len(), 1);
    assert_eq!(services.items[0].id, plan.id);

    let cheap = product_service::list_products(
        &state,
        &admin,
        Pagination::default(),
        ProductQuery {
            max_price: Some(50.0),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("list");
    assert_eq!(cheap.items.len(), 1);
    assert_eq!(cheap.items[0].id, item.id);
    Ok(())
}

#[tokio::test]
async fn product_kind_cannot_change() -> anyhow::Result<()> {
    let (state, _) = setup_state().await?;
    let admin = auth_user(Role::Admin);
    let plan = create(&state, monthly_plan()).await?;

    let result = product_service::update_product(
        &state,
        &admin,
        plan.id,
        UpdateProductRequest {
            details: shaker().details.into(),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let updated = product_service::update_product(
        &state,
        &admin,
        plan.id,
        UpdateProductRequest {
            price: Some(139.0),
            details: Some(ProductDetails::Service {
                duration_months: 3,
                recurring: false,
                benefits: None,
            }),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("product");
    assert_eq!(updated.price, 139.0);
    assert_eq!(
        updated.details,
        ProductDetails::Service {
            duration_months: 3,
            recurring: false,
            benefits: None,
        }
    );
    Ok(())
}

#[tokio::test]
async fn product_delete_removes_variant() -> anyhow::Result<()> {
    let (state, _) = setup_state().await?;
    let admin = auth_user(Role::Admin);
    let item = create(&state, shaker()).await?;

    product_service::delete_product(&state, &admin, item.id).await?;
    assert_eq!(PhysicalProducts::find().count(&state.orm).await?, 0);
    assert!(matches!(
        product_service::get_product(&state, &admin, item.id).await,
        Err(AppError::NotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn sale_profit_and_status_follow_updates() -> anyhow::Result<()> {
    let (state, _) = setup_state().await?;
    let admin = auth_user(Role::Admin);
    let item = create(&state, shaker()).await?;
    let buyer = customer(&state, "Gil Souto", date(1988, 8, 8), None, date(2024, 6, 1)).await?;

    let sale = sale_service::create_sale(
        &state,
        &admin,
        CreateSaleRequest {
            product_id: item.id,
            customer_id: buyer.id,
            price: 100.0,
            cost: 40.0,
            paid: false,
            quantity: 2,
            payment_method: PaymentMethod::CreditCard,
            status: None,
        },
    )
    .await?
    .data
    .expect("sale");
    assert_eq!(sale.profit, 60.0);
    assert_eq!(sale.status, PaymentStatus::Pending);

    let sale = sale_service::update_sale(
        &state,
        &admin,
        sale.id,
        UpdateSaleRequest {
            cost: Some(50.0),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("sale");
    assert_eq!(sale.profit, 50.0);
    assert_eq!(sale.status, PaymentStatus::Pending);

    let sale = sale_service::update_sale(
        &state,
        &admin,
        sale.id,
        UpdateSaleRequest {
            paid: Some(true),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("sale");
    assert!(sale.paid);
    assert_eq!(sale.status, PaymentStatus::Paid);
    Ok(())
}

#[tokio::test]
async fn cancelled_sale_stays_cancelled_when_paid() -> anyhow::Result<()> {
    let (state, _) = setup_state().await?;
    let admin = auth_user(Role::Admin);
    let item = create(&state, shaker()).await?;
    let buyer = customer(&state, "Helena Vaz", date(1979, 1, 9), None, date(2024, 6, 1)).await?;

    let sale = sale_service::create_sale(
        &state,
        &admin,
        CreateSaleRequest {
            product_id: item.id,
            customer_id: buyer.id,
            price: 20.0,
            cost: 25.0,
            paid: true,
            quantity: 1,
            payment_method: PaymentMethod::Boleto,
            status: Some(PaymentStatus::Cancelled),
        },
    )
    .await?
    .data
    .expect("sale");
    assert_eq!(sale.status, PaymentStatus::Cancelled);
    assert_eq!(sale.profit, -5.0);
    Ok(())
}

#[tokio::test]
async fn sale_requires_existing_references() -> anyhow::Result<()> {
    let (state, _) = setup_state().await?;
    let admin = auth_user(Role::Admin);
    let buyer = customer(&state, "Igor Melo", date(1990, 1, 1), None, date(2024, 6, 1)).await?;

    let result = sale_service::create_sale(
        &state,
        &admin,
        CreateSaleRequest {
            product_id: Uuid::new_v4(),
            customer_id: buyer.id,
            price: 10.0,
            cost: 5.0,
            paid: false,
            quantity: 1,
            payment_method: PaymentMethod::Pix,
            status: None,
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    Ok(())
}

fn subscription_for(customer_id: Uuid, billing_day: i32) -> CreateSubscriptionRequest {
    CreateSubscriptionRequest {
        customer_id,
        payment_method: PaymentMethod::CreditCard,
        billing_day,
        amount: 129.0,
        card_number: Some("4111 1111 1111 1111".into()),
        card_cvv: Some("737".into()),
    }
}

#[tokio::test]
async fn subscription_billing_and_card_handling() -> anyhow::Result<()> {
    let (state, _) = setup_state().await?;
    let member = customer(&state, "Julia Paz", date(1993, 5, 5), None, date(2024, 6, 1)).await?;

    let now = Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap();
    let sub = subscription_service::create_subscription_at(&state, subscription_for(member.id, 31), now)
        .await?
        .data
        .expect("subscription");

    assert_eq!(
        sub.next_billing_date,
        Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()
    );
    assert_eq!(sub.created_at, now);
    assert!(sub.next_billing_date >= sub.created_at);
    assert_eq!(sub.payment_status, PaymentStatus::Pending);
    assert!(sub.active);
    assert_eq!(sub.card_last_four.as_deref(), Some("1111"));

    let stored = Subscriptions::find_by_id(sub.id)
        .one(&state.orm)
        .await?
        .expect("row");
    let sealed = stored.card_number.expect("card stored");
    assert!(!sealed.contains("4111"));
    assert_eq!(state.cipher.decrypt_string(&sealed)?, "4111111111111111");
    assert_ne!(stored.card_cvv.as_deref(), Some("737"));

    let json = serde_json::to_value(&sub)?;
    assert!(json.get("card_number").is_none());
    assert!(json.get("card_cvv").is_none());
    Ok(())
}

#[tokio::test]
async fn subscription_update_and_cancel() -> anyhow::Result<()> {
    let (state, _) = setup_state().await?;
    let admin = auth_user(Role::Admin);
    let member = customer(&state, "Karla Reis", date(1993, 5, 5), None, date(2024, 6, 1)).await?;
    let sub = subscription_service::create_subscription(&state, &admin, subscription_for(member.id, 10))
        .await?
        .data
        .expect("subscription");
    assert!(sub.next_billing_date >= sub.created_at);

    let before = Utc::now();
    let updated = subscription_service::update_subscription(
        &state,
        &admin,
        sub.id,
        UpdateSubscriptionRequest {
            billing_day: Some(20),
            card_number: Some("5500 0000 0000 0004".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("subscription");
    assert_eq!(updated.billing_day, 20);
    assert_eq!(updated.card_last_four.as_deref(), Some("0004"));
    assert!(updated.next_billing_date >= before - chrono::Duration::days(1));

    let cancelled = subscription_service::cancel_subscription(&state, &admin, sub.id)
        .await?
        .data
        .expect("subscription");
    assert!(!cancelled.active);
    assert_eq!(cancelled.payment_status, PaymentStatus::Cancelled);

    let revived = subscription_service::update_subscription(
        &state,
        &admin,
        sub.id,
        UpdateSubscriptionRequest {
            active: Some(true),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(revived, Err(AppError::BadRequest(_))));
    let stored = subscription_service::get_subscription(&state, &admin, sub.id)
        .await?
        .data
        .expect("subscription");
    assert!(!stored.active);
    assert_eq!(stored.payment_status, PaymentStatus::Cancelled);

    let inactive = subscription_service::list_subscriptions(
        &state,
        &admin,
        Pagination::default(),
        SubscriptionQuery {
            active: Some(false),
            customer_id: None,
        },
    )
    .await?
    .data
    .expect("list");
    assert_eq!(inactive.items.len(), 1);
    assert_eq!(Subscriptions::find().count(&state.orm).await?, 1);
    Ok(())
}

#[tokio::test]
async fn subscription_requires_customer() -> anyhow::Result<()> {
    let (state, _) = setup_state().await?;
    let admin = auth_user(Role::Admin);
    let result =
        subscription_service::create_subscription(&state, &admin, subscription_for(Uuid::new_v4(), 5))
            .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    Ok(())
}
