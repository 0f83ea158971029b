use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    dto::banners::{BannerList, CreateBannerRequest, UpdateBannerRequest},
    entity::banners::{
        ActiveModel as BannerActive, Column as BannerCol, Entity as Banners, Model as BannerModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Banner,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Public listing: active banners in merchandising position order.
pub async fn list_active_banners(state: &AppState) -> AppResult<ApiResponse<BannerList>> {
    let items = Banners::find()
        .filter(BannerCol::IsActive.eq(true))
        .order_by_asc(BannerCol::Position)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(banner_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Banners",
        BannerList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_banner(
    state: &AppState,
    user: &AuthUser,
    payload: CreateBannerRequest,
) -> AppResult<ApiResponse<Banner>> {
    ensure_admin(user)?;
    let active = BannerActive {
        id: Set(Uuid::new_v4()),
        title: Set(payload.title),
        image_url: Set(payload.image_url),
        link_url: Set(payload.link_url),
        position: Set(payload.position.unwrap_or(0)),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_at: NotSet,
    };
    let banner = active.insert(&state.orm).await?;

    Ok(ApiResponse::success(
        "Banner created",
        banner_from_entity(banner),
        Some(Meta::empty()),
    ))
}

pub async fn update_banner(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateBannerRequest,
) -> AppResult<ApiResponse<Banner>> {
    ensure_admin(user)?;
    let existing = Banners::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(b) => b,
        None => return Err(AppError::NotFound),
    };

    let mut active: BannerActive = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(image_url);
    }
    if let Some(link_url) = payload.link_url {
        active.link_url = Set(Some(link_url));
    }
    if let Some(position) = payload.position {
        active.position = Set(position);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }

    let banner = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Banner updated",
        banner_from_entity(banner),
        Some(Meta::empty()),
    ))
}

pub async fn delete_banner(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Banners::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn banner_from_entity(model: BannerModel) -> Banner {
    Banner {
        id: model.id,
        title: model.title,
        image_url: model.image_url,
        link_url: model.link_url,
        position: model.position,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
