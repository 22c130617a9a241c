//! Partial `UPDATE` statements over an allow-listed set of columns.
//!
//! Edit forms only touch some columns (a password only when a new one was
//! typed, an image only when a file was uploaded). Column names come from the
//! per-table enums below and never from request input; values are always bound.

use sqlx::{mysql::MySql, Encode, QueryBuilder, Type};

use crate::errors::{AppError, AppResult};

/// A column that may appear in the `SET` list of an update on `TABLE`.
pub trait Column: Copy + PartialEq {
    const TABLE: &'static str;
    const KEY: &'static str;

    fn name(self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserColumn {
    FirstName,
    LastName,
    Email,
    Phone,
    Role,
    Password,
}

impl Column for UserColumn {
    const TABLE: &'static str = "users";
    const KEY: &'static str = "user_id";

    fn name(self) -> &'static str {
        match self {
            UserColumn::FirstName => "first_name",
            UserColumn::LastName  => "last_name",
            UserColumn::Email     => "email",
            UserColumn::Phone     => "phone",
            UserColumn::Role      => "role",
            UserColumn::Password  => "password",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TourColumn {
    TourName,
    Price,
    Description,
    Country,
    StartDate,
    EndDate,
    Seat,
    Image,
    GuideId,
}

impl Column for TourColumn {
    const TABLE: &'static str = "tours";
    const KEY: &'static str = "tour_id";

    fn name(self) -> &'static str {
        match self {
            TourColumn::TourName    => "tour_name",
            TourColumn::Price       => "price",
            TourColumn::Description => "description",
            TourColumn::Country     => "country",
            TourColumn::StartDate   => "start_date",
            TourColumn::EndDate     => "end_date",
            TourColumn::Seat        => "seat",
            TourColumn::Image       => "image",
            TourColumn::GuideId     => "guide_id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideColumn {
    FirstName,
    LastName,
    Email,
    Phone,
    Gender,
}

impl Column for GuideColumn {
    const TABLE: &'static str = "guides";
    const KEY: &'static str = "guide_id";

    fn name(self) -> &'static str {
        match self {
            GuideColumn::FirstName => "first_name",
            GuideColumn::LastName  => "last_name",
            GuideColumn::Email     => "email",
            GuideColumn::Phone     => "phone",
            GuideColumn::Gender    => "gender",
        }
    }
}

/// Builds `UPDATE <table> SET a = ?, b = ? WHERE <key> = ?`.
pub struct UpdateBuilder<'args, C: Column> {
    query:    QueryBuilder<'args, MySql>,
    assigned: Vec<C>,
}

impl<'args, C: Column> Default for UpdateBuilder<'args, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'args, C: Column> UpdateBuilder<'args, C> {
    pub fn new() -> Self {
        let mut query = QueryBuilder::new("UPDATE ");
        query.push(C::TABLE).push(" SET ");
        Self { query, assigned: Vec::new() }
    }

    /// Assign `column`. A column can be assigned once; repeats are ignored.
    pub fn set<T>(mut self, column: C, value: T) -> Self
    where
        T: 'args + Encode<'args, MySql> + Type<MySql>,
    {
        if self.assigned.contains(&column) {
            tracing::warn!(table = C::TABLE, column = column.name(), "Column assigned twice; keeping the first value");
            return self;
        }
        if !self.assigned.is_empty() {
            self.query.push(", ");
        }
        self.query.push(column.name()).push(" = ").push_bind(value);
        self.assigned.push(column);
        self
    }

    /// Assign `column` only when a value is present.
    pub fn set_some<T>(self, column: C, value: Option<T>) -> Self
    where
        T: 'args + Encode<'args, MySql> + Type<MySql>,
    {
        match value {
            Some(value) => self.set(column, value),
            None => self,
        }
    }

    /// Close the statement with the primary-key filter.
    pub fn where_key<K>(mut self, key: K) -> AppResult<QueryBuilder<'args, MySql>>
    where
        K: 'args + Encode<'args, MySql> + Type<MySql>,
    {
        if self.assigned.is_empty() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "UPDATE on {} with no columns",
                C::TABLE
            )));
        }
        self.query.push(" WHERE ").push(C::KEY).push(" = ").push_bind(key);
        Ok(self.query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_only_the_assigned_columns() {
        let query = UpdateBuilder::<UserColumn>::new()
            .set(UserColumn::FirstName, "Somchai".to_string())
            .set(UserColumn::Email, "somchai@example.com".to_string())
            .where_key(5_u64)
            .unwrap();
        assert_eq!(
            query.sql(),
            "UPDATE users SET first_name = ?, email = ? WHERE user_id = ?"
        );
    }

    #[test]
    fn optional_password_is_left_out_when_absent() {
        let without = UpdateBuilder::<UserColumn>::new()
            .set(UserColumn::Role, "staff".to_string())
            .set_some(UserColumn::Password, None::<String>)
            .where_key(1_u64)
            .unwrap();
        assert_eq!(without.sql(), "UPDATE users SET role = ? WHERE user_id = ?");

        let with = UpdateBuilder::<UserColumn>::new()
            .set(UserColumn::Role, "staff".to_string())
            .set_some(UserColumn::Password, Some("$argon2id$...".to_string()))
            .where_key(1_u64)
            .unwrap();
        assert_eq!(with.sql(), "UPDATE users SET role = ?, password = ? WHERE user_id = ?");
    }

    #[test]
    fn repeated_columns_are_assigned_once() {
        let query = UpdateBuilder::<GuideColumn>::new()
            .set(GuideColumn::Phone, "0812345678".to_string())
            .set(GuideColumn::Phone, "0899999999".to_string())
            .where_key(3_u64)
            .unwrap();
        assert_eq!(query.sql(), "UPDATE guides SET phone = ? WHERE guide_id = ?");
    }

    #[test]
    fn empty_update_is_refused() {
        let result = UpdateBuilder::<TourColumn>::new().where_key(1_u64);
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
