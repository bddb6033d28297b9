use chrono::Utc;
use diesel::dsl::count_star;
use diesel::pg::Pg;
use diesel::prelude::*;

use crate::db::models::*;
use crate::db::schema::*;

// ---- products ----

fn product_filter(
    category_id: Option<i32>,
    featured: Option<bool>,
) -> products::BoxedQuery<'static, Pg> {
    let mut query = products::table.into_boxed();
    if let Some(cat_id) = category_id {
        query = query.filter(products::category_id.eq(cat_id));
    }
    if let Some(flag) = featured {
        query = query.filter(products::featured.eq(flag));
    }
    query
}

pub fn list_products(
    conn: &mut PgConnection,
    category_id: Option<i32>,
    featured: Option<bool>,
) -> QueryResult<Vec<Product>> {
    product_filter(category_id, featured)
        .order(products::created_at.desc())
        .load(conn)
}

pub fn list_products_page(
    conn: &mut PgConnection,
    category_id: Option<i32>,
    featured: Option<bool>,
    page: i64,
    limit: i64,
) -> QueryResult<(Vec<Product>, i64)> {
    let total: i64 = product_filter(category_id, featured)
        .count()
        .get_result(conn)?;
    let items = product_filter(category_id, featured)
        .order(products::created_at.desc())
        .limit(limit)
        .offset((page - 1) * limit)
        .load(conn)?;
    Ok((items, total))
}

pub fn get_product(conn: &mut PgConnection, id: i32) -> QueryResult<Product> {
    products::table.find(id).first(conn)
}

pub fn create_product(conn: &mut PgConnection, new_product: NewProduct) -> QueryResult<Product> {
    diesel::insert_into(products::table)
        .values(new_product)
        .get_result(conn)
}

pub fn update_product(
    conn: &mut PgConnection,
    id: i32,
    product: UpdateProduct,
) -> QueryResult<Product> {
    diesel::update(products::table.find(id))
        .set((product, products::updated_at.eq(Utc::now().naive_utc())))
        .get_result(conn)
}

pub fn delete_product(conn: &mut PgConnection, id: i32) -> QueryResult<usize> {
    diesel::delete(products::table.find(id)).execute(conn)
}

pub fn count_products_in_category(conn: &mut PgConnection, category_id: i32) -> QueryResult<i64> {
    products::table
        .filter(products::category_id.eq(category_id))
        .count()
        .get_result(conn)
}

/// Products grouped on the denormalized brand name string. Brands are not a
/// foreign key of products, so this is the only join the two tables get.
pub fn product_counts_by_brand_name(
    conn: &mut PgConnection,
) -> QueryResult<Vec<(Option<String>, i64)>> {
    products::table
        .group_by(products::brand_name)
        .select((products::brand_name, count_star()))
        .load(conn)
}

// ---- categories ----

pub fn get_all_categories(conn: &mut PgConnection) -> QueryResult<Vec<Category>> {
    categories::table.order(categories::name.asc()).load(conn)
}

pub fn get_category(conn: &mut PgConnection, id: i32) -> QueryResult<Category> {
    categories::table.find(id).first(conn)
}

pub fn create_category(conn: &mut PgConnection, new_category: NewCategory) -> QueryResult<Category> {
    diesel::insert_into(categories::table)
        .values(new_category)
        .get_result(conn)
}

pub fn update_category(
    conn: &mut PgConnection,
    id: i32,
    category: UpdateCategory,
) -> QueryResult<Category> {
    diesel::update(categories::table.find(id))
        .set((category, categories::updated_at.eq(Utc::now().naive_utc())))
        .get_result(conn)
}

pub fn delete_category(conn: &mut PgConnection, id: i32) -> QueryResult<usize> {
    diesel::delete(categories::table.find(id)).execute(conn)
}

pub fn count_child_categories(conn: &mut PgConnection, parent_id: i32) -> QueryResult<i64> {
    categories::table
        .filter(categories::parent_id.eq(parent_id))
        .count()
        .get_result(conn)
}

// ---- brands ----

pub fn get_all_brands(conn: &mut PgConnection) -> QueryResult<Vec<Brand>> {
    brands::table.order(brands::name.asc()).load(conn)
}

pub fn get_brand(conn: &mut PgConnection, id: i32) -> QueryResult<Brand> {
    brands::table.find(id).first(conn)
}

pub fn create_brand(conn: &mut PgConnection, new_brand: NewBrand) -> QueryResult<Brand> {
    diesel::insert_into(brands::table)
        .values(new_brand)
        .get_result(conn)
}

pub fn update_brand(conn: &mut PgConnection, id: i32, brand: UpdateBrand) -> QueryResult<Brand> {
    diesel::update(brands::table.find(id))
        .set((brand, brands::updated_at.eq(Utc::now().naive_utc())))
        .get_result(conn)
}

pub fn delete_brand(conn: &mut PgConnection, id: i32) -> QueryResult<usize> {
    diesel::delete(brands::table.find(id)).execute(conn)
}

// ---- news ----

pub fn list_news(conn: &mut PgConnection, published_only: bool) -> QueryResult<Vec<NewsArticle>> {
    let mut query = news::table.into_boxed();
    if published_only {
        query = query.filter(news::published.eq(true));
    }
    query.order(news::created_at.desc()).load(conn)
}

pub fn get_news(conn: &mut PgConnection, id: i32) -> QueryResult<NewsArticle> {
    news::table.find(id).first(conn)
}

/// Public detail fetch: unconditionally restricted to published articles,
/// whatever the list endpoint was asked for. Unpublished articles are only
/// reachable through the authenticated admin detail route.
pub fn get_published_news(conn: &mut PgConnection, id: i32) -> QueryResult<NewsArticle> {
    news::table
        .find(id)
        .filter(news::published.eq(true))
        .first(conn)
}

pub fn create_news(conn: &mut PgConnection, new_article: NewNewsArticle) -> QueryResult<NewsArticle> {
    diesel::insert_into(news::table)
        .values(new_article)
        .get_result(conn)
}

pub fn update_news(
    conn: &mut PgConnection,
    id: i32,
    article: UpdateNewsArticle,
) -> QueryResult<NewsArticle> {
    diesel::update(news::table.find(id))
        .set((article, news::updated_at.eq(Utc::now().naive_utc())))
        .get_result(conn)
}

pub fn delete_news(conn: &mut PgConnection, id: i32) -> QueryResult<usize> {
    diesel::delete(news::table.find(id)).execute(conn)
}

// ---- users ----

pub fn find_user_by_email(conn: &mut PgConnection, email_val: &str) -> QueryResult<User> {
    users::table.filter(users::email.eq(email_val)).first(conn)
}

pub fn create_user(conn: &mut PgConnection, new_user: NewUser) -> QueryResult<User> {
    diesel::insert_into(users::table)
        .values(new_user)
        .get_result(conn)
}
