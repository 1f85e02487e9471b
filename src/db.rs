use crate::{
    errors::AppError,
    structs::{InventoryItem, NewItem, Role, User},
    utils, AppState,
};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

pub async fn find_user_by_username(
    state: &AppState,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    let pool = state.db_pool.clone();
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, password_hash, role FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(&pool)
    .await?;
    Ok(user)
}

pub async fn find_user_by_id(state: &AppState, id: i64) -> Result<Option<User>, sqlx::Error> {
    let pool = state.db_pool.clone();
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, password_hash, role FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?;
    Ok(user)
}

/// Inserts a new user. A username collision surfaces as
/// [`AppError::DuplicateUsername`]; the existing row is untouched.
pub async fn create_user(
    state: &AppState,
    username: &str,
    password_hash: &str,
    role: Role,
) -> Result<User, AppError> {
    let pool = state.db_pool.clone();
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, password_hash, role) VALUES ($1, $2, $3) \
         RETURNING id, username, password_hash, role",
    )
    .bind(username)
    .bind(password_hash)
    .bind(role)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return AppError::DuplicateUsername;
            }
        }
        AppError::Database(e)
    })?;
    log::info!("User {} created with role {:?}", user.username, user.role);
    Ok(user)
}

pub async fn update_user_password(
    state: &AppState,
    id: i64,
    password_hash: &str,
) -> Result<u64, sqlx::Error> {
    let pool = state.db_pool.clone();
    let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(password_hash)
        .bind(id)
        .execute(&pool)
        .await?;
    Ok(result.rows_affected())
}

/// Seeds the default admin account when the user table is empty. Safe to
/// call on every start; the schema itself comes from the migrations.
pub async fn bootstrap(state: &AppState) -> Result<(), AppError> {
    let pool = state.db_pool.clone();
    let user_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await?;
    if user_count > 0 {
        log::info!("Store already holds {} user(s), skipping seed", user_count);
        return Ok(());
    }

    let password_hash = utils::hash_password(DEFAULT_ADMIN_PASSWORD)?;
    create_user(state, DEFAULT_ADMIN_USERNAME, &password_hash, Role::Admin).await?;
    log::info!("Seeded default admin user");
    Ok(())
}

/// Items in insertion order (ids are AUTOINCREMENT, so primary-key order is
/// insertion order and ids are never reused).
pub async fn list_items(state: &AppState) -> Result<Vec<InventoryItem>, sqlx::Error> {
    let pool = state.db_pool.clone();
    sqlx::query_as::<_, InventoryItem>(
        "SELECT id, name, description, quantity, price, created_at \
         FROM inventory ORDER BY id",
    )
    .fetch_all(&pool)
    .await
}

pub async fn create_item(state: &AppState, item: &NewItem) -> Result<i64, sqlx::Error> {
    let created_at = chrono::Utc::now().to_rfc3339();
    let pool = state.db_pool.clone();
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO inventory (name, description, quantity, price, created_at) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(&item.name)
    .bind(&item.description)
    .bind(item.quantity)
    .bind(item.price)
    .bind(&created_at)
    .fetch_one(&pool)
    .await?;
    log::info!("Inventory item {} created", id);
    Ok(id)
}

/// Replaces every caller-settable field of the item. Returns the number of
/// affected rows; 0 means the id does not exist and nothing changed.
pub async fn update_item(state: &AppState, id: i64, item: &NewItem) -> Result<u64, sqlx::Error> {
    let pool = state.db_pool.clone();
    let result = sqlx::query(
        "UPDATE inventory SET name = $1, description = $2, quantity = $3, price = $4 \
         WHERE id = $5",
    )
    .bind(&item.name)
    .bind(&item.description)
    .bind(item.quantity)
    .bind(item.price)
    .bind(id)
    .execute(&pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete_item(state: &AppState, id: i64) -> Result<u64, sqlx::Error> {
    let pool = state.db_pool.clone();
    let result = sqlx::query("DELETE FROM inventory WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;
    if result.rows_affected() > 0 {
        log::info!("Inventory item {} deleted", id);
    }
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_state() -> AppState {
        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        sqlx::migrate!().run(&db_pool).await.expect("migrations");
        AppState { db_pool }
    }

    fn sample_item() -> NewItem {
        NewItem {
            name: "Bandages".to_owned(),
            description: "Box of 50".to_owned(),
            quantity: 12,
            price: 4.75,
        }
    }

    #[tokio::test]
    async fn bootstrap_seeds_admin_exactly_once() {
        let state = test_state().await;
        bootstrap(&state).await.expect("first bootstrap");
        bootstrap(&state).await.expect("second bootstrap");

        let admin = find_user_by_username(&state, "admin")
            .await
            .unwrap()
            .expect("admin seeded");
        assert_eq!(admin.role, Role::Admin);
        assert!(utils::verify_password("admin123", &admin.password_hash));

        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&state.db_pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected_and_first_row_kept() {
        let state = test_state().await;
        let first = create_user(&state, "frida", "hash-one", Role::Member)
            .await
            .unwrap();

        let err = create_user(&state, "frida", "hash-two", Role::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername));

        let kept = find_user_by_username(&state, "frida")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.id, first.id);
        assert_eq!(kept.password_hash, "hash-one");
        assert_eq!(kept.role, Role::Member);
    }

    #[tokio::test]
    async fn insert_then_list_shows_item_once() {
        let state = test_state().await;
        let id = create_item(&state, &sample_item()).await.unwrap();

        let items = list_items(&state).await.unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.id, id);
        assert_eq!(item.name, "Bandages");
        assert_eq!(item.description, "Box of 50");
        assert_eq!(item.quantity, 12);
        assert_eq!(item.price, 4.75);
        assert!(!item.created_at.is_empty());
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let state = test_state().await;
        let first = create_item(&state, &sample_item()).await.unwrap();
        assert_eq!(delete_item(&state, first).await.unwrap(), 1);

        let second = create_item(&state, &sample_item()).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn update_missing_id_reports_zero_changes() {
        let state = test_state().await;
        let id = create_item(&state, &sample_item()).await.unwrap();

        let changes = update_item(&state, id + 1, &sample_item()).await.unwrap();
        assert_eq!(changes, 0);

        // the existing row is untouched
        let items = list_items(&state).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Bandages");
    }

    #[tokio::test]
    async fn update_overwrites_fields_but_not_created_at() {
        let state = test_state().await;
        let id = create_item(&state, &sample_item()).await.unwrap();
        let created_at = list_items(&state).await.unwrap()[0].created_at.clone();

        let changes = update_item(
            &state,
            id,
            &NewItem {
                name: "Gauze".to_owned(),
                description: String::new(),
                quantity: 3,
                price: 1.5,
            },
        )
        .await
        .unwrap();
        assert_eq!(changes, 1);

        let items = list_items(&state).await.unwrap();
        assert_eq!(items[0].name, "Gauze");
        assert_eq!(items[0].description, "");
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[0].price, 1.5);
        assert_eq!(items[0].created_at, created_at);
    }

    #[tokio::test]
    async fn delete_missing_id_reports_zero_changes() {
        let state = test_state().await;
        assert_eq!(delete_item(&state, 42).await.unwrap(), 0);
    }
}
