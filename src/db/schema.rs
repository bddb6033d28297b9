diesel::table! {
    categories (id) {
        id -> Int4,
        name -> Varchar,
        description -> Nullable<Text>,
        image -> Nullable<Varchar>,
        parent_id -> Nullable<Int4>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    products (id) {
        id -> Int4,
        code -> Varchar,
        name -> Varchar,
        description -> Nullable<Text>,
        image -> Nullable<Varchar>,
        brand_name -> Nullable<Varchar>,
        brand_logo -> Nullable<Varchar>,
        category_id -> Int4,
        featured -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    brands (id) {
        id -> Int4,
        name -> Varchar,
        logo -> Nullable<Varchar>,
        description -> Nullable<Text>,
        website -> Nullable<Varchar>,
        featured -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    news (id) {
        id -> Int4,
        title -> Varchar,
        content -> Text,
        excerpt -> Nullable<Text>,
        image -> Nullable<Varchar>,
        published -> Bool,
        published_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    users (id) {
        id -> Int4,
        email -> Varchar,
        password_hash -> Varchar,
        name -> Varchar,
        role -> Varchar,
    }
}

diesel::joinable!(products -> categories (category_id));

diesel::allow_tables_to_appear_in_same_query!(
    categories,
    products,
    brands,
    news,
    users,
);
