use chrono::{Local, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::customers::{
        CreateCustomerRequest, CustomerBasicList, CustomerList, GuardianInput,
        UpdateCustomerRequest,
    },
    entity::{
        Guardians, Sales, Subscriptions,
        customers::{ActiveModel, Column, Entity as Customers, Model as CustomerModel},
        guardians::{self, Model as GuardianModel},
        sales, subscriptions,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Customer, CustomerBasic, Gender, Guardian},
    response::{ApiResponse, Meta},
    routes::params::{CustomerQuery, Pagination},
    rules,
    services::{parse_column, timestamp_now},
    state::AppState,
};

pub async fn list_customers(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
    query: CustomerQuery,
) -> AppResult<ApiResponse<CustomerList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let mut condition = Condition::all();
    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(Column::Name.contains(search))
                .add(Column::Email.contains(search)),
        );
    }

    let finder = Customers::find()
        .filter(condition)
        .order_by_asc(Column::Name);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .find_also_related(Guardians)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(customer, guardian)| customer_from_entity(customer, guardian))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Customers",
        CustomerList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Id, name and email of every customer, for pickers in the back office.
pub async fn list_customers_basic(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CustomerBasicList>> {
    ensure_admin(user)?;
    let items = Customers::find()
        .select_only()
        .columns([Column::Id, Column::Name, Column::Email])
        .order_by_asc(Column::Name)
        .into_tuple::<(Uuid, String, String)>()
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(id, name, email)| CustomerBasic { id, name, email })
        .collect();

    Ok(ApiResponse::success(
        "Customers",
        CustomerBasicList { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_customer(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Customer>> {
    ensure_admin(user)?;
    let found = Customers::find_by_id(id)
        .find_also_related(Guardians)
        .one(&state.orm)
        .await?;
    let (customer, guardian) = match found {
        Some(pair) => pair,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success(
        "Customer",
        customer_from_entity(customer, guardian)?,
        None,
    ))
}

pub async fn create_customer(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCustomerRequest,
) -> AppResult<ApiResponse<Customer>> {
    ensure_admin(user)?;
    create_customer_on(state, payload, Local::now().date_naive()).await
}

/// Creates a customer, attaching a guardian when the customer is a minor on
/// `today`.
pub async fn create_customer_on(
    state: &AppState,
    payload: CreateCustomerRequest,
    today: NaiveDate,
) -> AppResult<ApiResponse<Customer>> {
    let CreateCustomerRequest { customer, guardian } = payload;
    customer.validate()?;

    let guardian = if rules::requires_guardian(customer.birth_date, today) {
        let guardian = guardian.ok_or_else(|| {
            AppError::BadRequest("guardian is required for customers under 18".into())
        })?;
        guardian.validate()?;
        Some(guardian)
    } else {
        None
    };

    let customer_id = Uuid::new_v4();
    let guardian_id = guardian.as_ref().map(|_| Uuid::new_v4());
    let now = timestamp_now();

    let txn = state.orm.begin().await?;
    let created = ActiveModel {
        id: Set(customer_id),
        name: Set(customer.name.trim().to_string()),
        birth_date: Set(customer.birth_date),
        gender: Set(customer.gender.as_str().to_string()),
        email: Set(customer.email),
        phone: Set(customer.phone),
        tax_id: Set(customer.tax_id),
        address: Set(customer.address),
        city: Set(customer.city),
        state: Set(customer.state),
        postal_code: Set(customer.postal_code),
        birthday_flag: Set(customer.birthday_flag),
        delinquent_flag: Set(customer.delinquent_flag),
        guardian_id: Set(guardian_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let guardian = match (guardian, guardian_id) {
        (Some(input), Some(id)) => Some(insert_guardian(&txn, id, customer_id, input).await?),
        _ => None,
    };
    txn.commit().await?;

    tracing::info!(
        customer_id = %created.id,
        guardian = guardian.is_some(),
        "customer created"
    );
    Ok(ApiResponse::success(
        "Customer created",
        customer_from_entity(created, guardian)?,
        Some(Meta::empty()),
    ))
}

async fn insert_guardian<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    customer_id: Uuid,
    input: GuardianInput,
) -> AppResult<GuardianModel> {
    let now = timestamp_now();
    let model = guardians::ActiveModel {
        id: Set(id),
        customer_id: Set(customer_id),
        father_name: Set(input.father_name),
        father_phone: Set(input.father_phone),
        father_email: Set(input.father_email),
        father_tax_id: Set(input.father_tax_id),
        mother_name: Set(input.mother_name),
        mother_phone: Set(input.mother_phone),
        mother_email: Set(input.mother_email),
        mother_tax_id: Set(input.mother_tax_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;
    Ok(model)
}

pub async fn update_customer(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCustomerRequest,
) -> AppResult<ApiResponse<Customer>> {
    ensure_admin(user)?;
    payload.validate()?;
    let existing = Customers::find_by_id(id)
        .find_also_related(Guardians)
        .one(&state.orm)
        .await?;
    let (existing, guardian) = match existing {
        Some(pair) => pair,
        None => return Err(AppError::NotFound),
    };

    if let Some(birth_date) = payload.birth_date {
        let today = Local::now().date_naive();
        if rules::requires_guardian(birth_date, today) && existing.guardian_id.is_none() {
            return Err(AppError::BadRequest(
                "guardian is required for customers under 18".into(),
            ));
        }
    }

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(birth_date) = payload.birth_date {
        active.birth_date = Set(birth_date);
    }
    if let Some(gender) = payload.gender {
        active.gender = Set(gender.as_str().to_string());
    }
    if let Some(email) = payload.email {
        active.email = Set(email);
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(phone);
    }
    if let Some(tax_id) = payload.tax_id {
        active.tax_id = Set(tax_id);
    }
    if let Some(address) = payload.address {
        active.address = Set(address);
    }
    if let Some(city) = payload.city {
        active.city = Set(city);
    }
    if let Some(state_code) = payload.state {
        active.state = Set(state_code);
    }
    if let Some(postal_code) = payload.postal_code {
        active.postal_code = Set(postal_code);
    }
    if let Some(flag) = payload.birthday_flag {
        active.birthday_flag = Set(flag);
    }
    if let Some(flag) = payload.delinquent_flag {
        active.delinquent_flag = Set(flag);
    }
    active.updated_at = Set(timestamp_now());

    let updated = active.update(&state.orm).await?;
    tracing::info!(customer_id = %updated.id, "customer updated");
    Ok(ApiResponse::success(
        "Updated",
        customer_from_entity(updated, guardian)?,
        Some(Meta::empty()),
    ))
}

/// Deletes a customer and its guardian. Customers referenced by sales or
/// subscriptions are kept.
pub async fn delete_customer(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;
    if Customers::find_by_id(id).one(&txn).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let sale_count = Sales::find()
        .filter(sales::Column::CustomerId.eq(id))
        .count(&txn)
        .await?;
    let subscription_count = Subscriptions::find()
        .filter(subscriptions::Column::CustomerId.eq(id))
        .count(&txn)
        .await?;
    if sale_count > 0 || subscription_count > 0 {
        return Err(AppError::BadRequest(format!(
            "customer has {sale_count} sales and {subscription_count} subscriptions"
        )));
    }

    Guardians::delete_many()
        .filter(guardians::Column::CustomerId.eq(id))
        .exec(&txn)
        .await?;
    Customers::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(customer_id = %id, "customer deleted");
    Ok(ApiResponse::done("Deleted"))
}

fn guardian_from_entity(model: GuardianModel) -> Guardian {
    Guardian {
        id: model.id,
        customer_id: model.customer_id,
        father_name: model.father_name,
        father_phone: model.father_phone,
        father_email: model.father_email,
        father_tax_id: model.father_tax_id,
        mother_name: model.mother_name,
        mother_phone: model.mother_phone,
        mother_email: model.mother_email,
        mother_tax_id: model.mother_tax_id,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn customer_from_entity(
    model: CustomerModel,
    guardian: Option<GuardianModel>,
) -> AppResult<Customer> {
    Ok(Customer {
        id: model.id,
        name: model.name,
        birth_date: model.birth_date,
        gender: parse_column::<Gender>("customers.gender", &model.gender)?,
        email: model.email,
        phone: model.phone,
        tax_id: model.tax_id,
        address: model.address,
        city: model.city,
        state: model.state,
        postal_code: model.postal_code,
        birthday_flag: model.birthday_flag,
        delinquent_flag: model.delinquent_flag,
        guardian_id: model.guardian_id,
        guardian: guardian.map(guardian_from_entity),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
