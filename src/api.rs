use actix_web::{
    delete, get, post, put,
    web::{self, Data},
    HttpResponse, Responder,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{AdminUser, AuthedUser},
    db,
    errors::AppError,
    structs::NewItem,
    AppState,
};

/// Inventory fields as submitted by the browser. Numeric fields arrive as
/// text and are parsed here; anything that is not a number is rejected with
/// a 400 instead of being coerced.
#[derive(Deserialize)]
pub struct ItemPayload {
    name: String,
    #[serde(default)]
    description: String,
    quantity: String,
    price: String,
}

impl ItemPayload {
    fn into_new_item(self) -> Result<NewItem, AppError> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(AppError::BadRequest("name is required".to_owned()));
        }
        let quantity = self.quantity.trim().parse::<i64>().map_err(|_| {
            AppError::BadRequest(format!("quantity is not a whole number: {:?}", self.quantity))
        })?;
        let price = self
            .price
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite())
            .ok_or_else(|| AppError::BadRequest(format!("price is not a number: {:?}", self.price)))?;

        Ok(NewItem {
            name,
            description: self.description.trim().to_owned(),
            quantity,
            price,
        })
    }
}

#[get("/api/inventory")]
pub async fn list_handler(
    _user: AuthedUser,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let items = db::list_items(&state).await.map_err(|e| {
        log::error!("Failed to list inventory: {}", e);
        AppError::Database(e)
    })?;
    Ok(HttpResponse::Ok().json(items))
}

#[post("/api/inventory")]
pub async fn create_handler(
    _user: AuthedUser,
    state: Data<AppState>,
    payload: web::Json<ItemPayload>,
) -> Result<impl Responder, AppError> {
    let item = payload.into_inner().into_new_item()?;
    let id = db::create_item(&state, &item).await?;
    Ok(HttpResponse::Ok().json(json!({ "id": id })))
}

#[put("/api/inventory/{id}")]
pub async fn update_handler(
    _user: AuthedUser,
    state: Data<AppState>,
    path: web::Path<i64>,
    payload: web::Json<ItemPayload>,
) -> Result<impl Responder, AppError> {
    let id = path.into_inner();
    let item = payload.into_inner().into_new_item()?;
    let changes = db::update_item(&state, id, &item).await?;
    if changes == 0 {
        return Err(AppError::NotFound);
    }
    Ok(HttpResponse::Ok().json(json!({ "changes": changes })))
}

#[delete("/api/inventory/{id}")]
pub async fn delete_handler(
    admin: AdminUser,
    state: Data<AppState>,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let id = path.into_inner();
    let changes = db::delete_item(&state, id).await?;
    if changes == 0 {
        return Err(AppError::NotFound);
    }
    log::info!("Inventory item {} deleted by {}", id, admin.0.username);
    Ok(HttpResponse::Ok().json(json!({ "changes": changes })))
}
