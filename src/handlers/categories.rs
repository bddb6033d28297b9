use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::auth::AdminUser;
use crate::db::models::{Category, NewCategory, UpdateCategory};
use crate::db::repository;
use crate::error::{self, ApiError};
use crate::validate::{normalize_optional, normalize_patch, FieldChecks};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTree {
    #[serde(flatten)]
    pub category: Category,
    pub parent: Option<Category>,
    pub children: Vec<Category>,
}

/// Single grouping pass over the flat list. Only direct children are
/// embedded; the schema permits deeper nesting but the site renders one
/// level, so deeper descendants are simply not expanded here.
pub fn build_tree(categories: Vec<Category>) -> Vec<CategoryTree> {
    let by_id: HashMap<i32, Category> = categories.iter().map(|c| (c.id, c.clone())).collect();
    let mut children_of: HashMap<i32, Vec<Category>> = HashMap::new();
    for category in &categories {
        if let Some(parent_id) = category.parent_id {
            children_of
                .entry(parent_id)
                .or_default()
                .push(category.clone());
        }
    }
    categories
        .into_iter()
        .map(|category| {
            let parent = category
                .parent_id
                .and_then(|parent_id| by_id.get(&parent_id).cloned());
            let children = children_of.get(&category.id).cloned().unwrap_or_default();
            CategoryTree {
                category,
                parent,
                children,
            }
        })
        .collect()
}

pub async fn list(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let conn = &mut data.pool.get()?;
    let categories = repository::get_all_categories(conn)?;
    Ok(HttpResponse::Ok().json(build_tree(categories)))
}

pub async fn admin_list(
    _admin: AdminUser,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    list(data).await
}

pub async fn admin_get(
    _admin: AdminUser,
    data: web::Data<AppState>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let conn = &mut data.pool.get()?;
    let category = repository::get_category(conn, id.into_inner())
        .map_err(|e| error::not_found("Category", e))?;
    Ok(HttpResponse::Ok().json(category))
}

pub async fn create(
    _admin: AdminUser,
    data: web::Data<AppState>,
    payload: web::Json<NewCategory>,
) -> Result<HttpResponse, ApiError> {
    let mut new_category = payload.into_inner();
    new_category.description = normalize_optional(new_category.description);
    new_category.image = normalize_optional(new_category.image);

    let mut checks = FieldChecks::new();
    checks
        .require("name", &new_category.name)
        .url_or_path("image", new_category.image.as_deref());
    if let Some(parent_id) = new_category.parent_id {
        checks.require_id("parentId", parent_id);
    }
    checks.finish()?;

    let conn = &mut data.pool.get()?;
    let category = repository::create_category(conn, new_category)?;
    Ok(HttpResponse::Created().json(category))
}

pub async fn update(
    _admin: AdminUser,
    data: web::Data<AppState>,
    id: web::Path<i32>,
    payload: web::Json<UpdateCategory>,
) -> Result<HttpResponse, ApiError> {
    let category_id = id.into_inner();
    let mut patch = payload.into_inner();
    patch.description = normalize_patch(patch.description);
    patch.image = normalize_patch(patch.image);

    let mut checks = FieldChecks::new();
    if let Some(name) = &patch.name {
        checks.require("name", name);
    }
    if let Some(Some(image)) = &patch.image {
        checks.url_or_path("image", Some(image));
    }
    // Single-hop loop prevention only; multi-hop cycles (A -> B -> A) are a
    // known gap and are not checked.
    if patch.parent_id == Some(Some(category_id)) {
        checks.fail("parentId", "Category cannot be its own parent");
    }
    checks.finish()?;

    let conn = &mut data.pool.get()?;
    let category = repository::update_category(conn, category_id, patch)
        .map_err(|e| error::not_found("Category", e))?;
    Ok(HttpResponse::Ok().json(category))
}

/// Referential guard: a category still referenced by products or
/// subcategories cannot be deleted. The count checks and the delete are not
/// wrapped in a transaction, so a concurrent insert can race past the guard.
pub async fn delete(
    _admin: AdminUser,
    data: web::Data<AppState>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let category_id = id.into_inner();
    let conn = &mut data.pool.get()?;
    if repository::count_products_in_category(conn, category_id)? > 0 {
        return Err(ApiError::BadRequest(
            "Cannot delete category with products".to_string(),
        ));
    }
    if repository::count_child_categories(conn, category_id)? > 0 {
        return Err(ApiError::BadRequest(
            "Cannot delete category with subcategories".to_string(),
        ));
    }
    let deleted = repository::delete_category(conn, category_id)?;
    if deleted == 0 {
        return Err(ApiError::NotFound("Category not found".to_string()));
    }
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn category(id: i32, name: &str, parent_id: Option<i32>) -> Category {
        let now = Utc::now().naive_utc();
        Category {
            id,
            name: name.to_string(),
            description: None,
            image: None,
            parent_id,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn tree_embeds_parent_and_direct_children() {
        let tree = build_tree(vec![
            category(1, "Pumps", None),
            category(2, "Centrifugal", Some(1)),
            category(3, "Submersible", Some(1)),
        ]);
        let root = tree.iter().find(|t| t.category.id == 1).unwrap();
        assert!(root.parent.is_none());
        let mut child_ids: Vec<i32> = root.children.iter().map(|c| c.id).collect();
        child_ids.sort_unstable();
        assert_eq!(child_ids, vec![2, 3]);

        let child = tree.iter().find(|t| t.category.id == 2).unwrap();
        assert_eq!(child.parent.as_ref().map(|p| p.id), Some(1));
        assert!(child.children.is_empty());
    }

    #[test]
    fn tree_stops_at_one_level_of_children() {
        let tree = build_tree(vec![
            category(1, "Tools", None),
            category(2, "Power Tools", Some(1)),
            category(3, "Drills", Some(2)),
        ]);
        let root = tree.iter().find(|t| t.category.id == 1).unwrap();
        // the grandchild hangs off its own parent entry, not the root's
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].id, 2);
        let mid = tree.iter().find(|t| t.category.id == 2).unwrap();
        assert_eq!(mid.children.len(), 1);
        assert_eq!(mid.children[0].id, 3);
    }

    #[test]
    fn dangling_parent_reference_is_dropped() {
        let tree = build_tree(vec![category(5, "Orphan", Some(99))]);
        assert!(tree[0].parent.is_none());
    }
}
