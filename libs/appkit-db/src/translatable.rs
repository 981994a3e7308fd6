//! Translation-aware repository over SeaORM selects.
//!
//! Entities keep their base values in their own table; per-locale
//! overrides live in a side table (`<table>_translations` with
//! `entity_id`, `locale`, `field`, `content` columns). Every query
//! executed through the repository funnels through a single
//! hint-attachment step ([`TranslatableRepository::prepare`]): the
//! resulting [`TranslatedQuery`] always carries the fallback hint, and
//! carries a locale hint iff one is resolvable (explicit argument, else
//! the repository default). Hydration substitutes translated values into
//! the fetched rows, falling back to base values for untranslated fields.

use std::collections::HashMap;

use parking_lot::RwLock;
use sea_orm::sea_query::{Alias, Expr, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, FromQueryResult, Order,
    QueryFilter, QueryOrder, QuerySelect, Select, Value,
};

#[derive(Debug, thiserror::Error)]
pub enum TranslatableError {
    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("no result found")]
    NotFound,

    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

pub type TranslatableResult<T> = Result<T, TranslatableError>;

/// API-name → column mapping. Criteria and ordering may only address
/// mapped fields; lookups are case-insensitive.
#[derive(Clone)]
pub struct FieldMap<E: EntityTrait> {
    map: HashMap<String, E::Column>,
}

impl<E: EntityTrait> Default for FieldMap<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityTrait> FieldMap<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    #[must_use]
    pub fn insert(mut self, api_name: impl Into<String>, col: E::Column) -> Self {
        self.map.insert(api_name.into().to_lowercase(), col);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<E::Column> {
        self.map.get(&name.to_lowercase()).copied()
    }
}

/// Sort direction for [`OrderBy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl From<SortDir> for Order {
    fn from(dir: SortDir) -> Self {
        match dir {
            SortDir::Asc => Order::Asc,
            SortDir::Desc => Order::Desc,
        }
    }
}

/// Ordered equality criteria (`field = value AND ...`).
#[derive(Clone, Debug, Default)]
pub struct Criteria {
    items: Vec<(String, Value)>,
}

impl Criteria {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.items.push((field.into(), value.into()));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Ordered sort specification.
#[derive(Clone, Debug, Default)]
pub struct OrderBy {
    items: Vec<(String, SortDir)>,
}

impl OrderBy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn asc(mut self, field: impl Into<String>) -> Self {
        self.items.push((field.into(), SortDir::Asc));
        self
    }

    #[must_use]
    pub fn desc(mut self, field: impl Into<String>) -> Self {
        self.items.push((field.into(), SortDir::Desc));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SortDir)> {
        self.items.iter().map(|(k, d)| (k.as_str(), *d))
    }
}

/// Hints attached to every query executed through the repository.
///
/// `fallback` is always on: fields without a translation keep their base
/// values. `locale` is present iff a locale was resolvable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslationHints {
    pub fallback: bool,
    pub locale: Option<String>,
}

/// A select with its translation hints attached, ready for hydration.
pub struct TranslatedQuery<E: EntityTrait> {
    select: Select<E>,
    hints: TranslationHints,
}

impl<E: EntityTrait> TranslatedQuery<E> {
    #[must_use]
    pub fn hints(&self) -> &TranslationHints {
        &self.hints
    }

    #[must_use]
    pub fn into_parts(self) -> (Select<E>, TranslationHints) {
        (self.select, self.hints)
    }
}

/// How an entity maps onto its translation side table.
#[derive(Clone, Debug)]
pub struct TranslationSpec {
    /// Side table name, conventionally `<table>_translations`.
    pub table: String,
    /// API name of the key column, used for JSON hydration.
    pub key_field: String,
    /// Field names that may carry translations.
    pub fields: Vec<String>,
}

impl TranslationSpec {
    /// Conventional spec for an entity table.
    #[must_use]
    pub fn for_table(
        entity_table: &str,
        key_field: impl Into<String>,
        fields: Vec<String>,
    ) -> Self {
        Self {
            table: format!("{entity_table}_translations"),
            key_field: key_field.into(),
            fields,
        }
    }
}

/// Implemented by models whose fields can be substituted with translations.
pub trait Translatable {
    /// The value that matches the side table's `entity_id` column.
    fn translation_key(&self) -> String;

    /// Replace one field's value with its translation. Unknown fields are
    /// ignored.
    fn apply_translation(&mut self, field: &str, content: &str);
}

#[derive(Debug, FromQueryResult)]
struct TranslationRow {
    entity_id: String,
    field: String,
    content: String,
}

/// Repository wrapper injecting locale-aware hydration into SeaORM selects.
pub struct TranslatableRepository<E: EntityTrait> {
    conn: DatabaseConnection,
    fields: FieldMap<E>,
    spec: TranslationSpec,
    default_locale: RwLock<Option<String>>,
}

impl<E> TranslatableRepository<E>
where
    E: EntityTrait,
    E::Model: Translatable,
{
    #[must_use]
    pub fn new(conn: DatabaseConnection, fields: FieldMap<E>, spec: TranslationSpec) -> Self {
        Self {
            conn,
            fields,
            spec,
            default_locale: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn set_default_locale(&self, locale: impl Into<String>) {
        *self.default_locale.write() = Some(locale.into());
    }

    #[must_use]
    pub fn default_locale(&self) -> Option<String> {
        self.default_locale.read().clone()
    }

    /// Seed the default locale from a request's `Accept-Language` value.
    /// Wildcards and empty values leave the default untouched.
    pub fn set_locale_from_request(&self, accept_language: &str) {
        if let Some(tag) = primary_language_tag(accept_language) {
            self.set_default_locale(tag);
        }
    }

    /// The single hint-attachment step all reads funnel through.
    ///
    /// Locale resolution order: explicit argument, else repository default,
    /// else none.
    pub fn prepare(&self, select: Select<E>, locale: Option<&str>) -> TranslatedQuery<E> {
        let locale = locale
            .map(str::to_owned)
            .or_else(|| self.default_locale.read().clone());
        TranslatedQuery {
            select,
            hints: TranslationHints {
                fallback: true,
                locale,
            },
        }
    }

    // ---- criteria-based finders ----

    /// All rows, translated for the repository's locale.
    ///
    /// # Errors
    /// Surfaces database errors.
    pub async fn find_all(&self) -> TranslatableResult<Vec<E::Model>> {
        self.all(E::find(), None).await
    }

    /// Rows matching the equality criteria, optionally ordered and paged.
    ///
    /// # Errors
    /// `UnknownField` for unmapped criteria/order fields, otherwise
    /// database errors.
    pub async fn find_by(
        &self,
        criteria: &Criteria,
        order: Option<&OrderBy>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> TranslatableResult<Vec<E::Model>> {
        let select = self.select_for(criteria, order, limit, offset)?;
        self.all(select, None).await
    }

    /// First row matching the criteria, or `None`.
    ///
    /// # Errors
    /// Same failure modes as [`find_by`](Self::find_by).
    pub async fn find_one_by(
        &self,
        criteria: &Criteria,
        order: Option<&OrderBy>,
    ) -> TranslatableResult<Option<E::Model>> {
        let select = self.select_for(criteria, order, Some(1), None)?;
        Ok(self.all(select, None).await?.into_iter().next())
    }

    // ---- hydration over caller-built selects ----

    /// Execute a select with translation hydration.
    ///
    /// # Errors
    /// Surfaces database errors.
    pub async fn all(
        &self,
        select: Select<E>,
        locale: Option<&str>,
    ) -> TranslatableResult<Vec<E::Model>> {
        self.hydrate(self.prepare(select, locale)).await
    }

    /// First row of the select, or `None`.
    ///
    /// # Errors
    /// Surfaces database errors.
    pub async fn one_or_none(
        &self,
        select: Select<E>,
        locale: Option<&str>,
    ) -> TranslatableResult<Option<E::Model>> {
        let select = select.limit(1u64);
        Ok(self.all(select, locale).await?.into_iter().next())
    }

    /// First row of the select, or [`TranslatableError::NotFound`].
    ///
    /// # Errors
    /// `NotFound` on an empty result, otherwise database errors.
    pub async fn one(&self, select: Select<E>, locale: Option<&str>) -> TranslatableResult<E::Model> {
        self.one_or_none(select, locale)
            .await?
            .ok_or(TranslatableError::NotFound)
    }

    /// Array hydration: rows as JSON objects, translations applied.
    ///
    /// # Errors
    /// Surfaces database errors.
    pub async fn all_json(
        &self,
        select: Select<E>,
        locale: Option<&str>,
    ) -> TranslatableResult<Vec<serde_json::Value>> {
        let (select, hints) = self.prepare(select, locale).into_parts();
        let mut rows = select.into_json().all(&self.conn).await?;

        if let Some(locale) = hints.locale.as_deref() {
            if !rows.is_empty() && !self.spec.fields.is_empty() {
                let keys: Vec<String> = rows
                    .iter()
                    .filter_map(|row| json_key(row, &self.spec.key_field))
                    .collect();
                let grouped = group_rows(self.translation_rows(locale, &keys).await?);
                for row in &mut rows {
                    let Some(key) = json_key(row, &self.spec.key_field) else {
                        continue;
                    };
                    let Some(translations) = grouped.get(&key) else {
                        continue;
                    };
                    if let Some(obj) = row.as_object_mut() {
                        for (field, content) in translations {
                            if self.spec.fields.contains(field) && obj.contains_key(field) {
                                obj.insert(field.clone(), serde_json::Value::String(content.clone()));
                            }
                        }
                    }
                }
            }
        }
        Ok(rows)
    }

    /// Scalar hydration: one field out of each row, translations applied
    /// when the field is translatable.
    ///
    /// # Errors
    /// `UnknownField` when the field is not part of the JSON rows,
    /// otherwise database errors.
    pub async fn scalar_all(
        &self,
        select: Select<E>,
        field: &str,
        locale: Option<&str>,
    ) -> TranslatableResult<Vec<serde_json::Value>> {
        let rows = self.all_json(select, locale).await?;
        rows.into_iter()
            .map(|row| {
                row.get(field)
                    .cloned()
                    .ok_or_else(|| TranslatableError::UnknownField(field.to_owned()))
            })
            .collect()
    }

    /// Single scalar value of the first row.
    ///
    /// # Errors
    /// `NotFound` on an empty result; otherwise as [`scalar_all`](Self::scalar_all).
    pub async fn scalar_one(
        &self,
        select: Select<E>,
        field: &str,
        locale: Option<&str>,
    ) -> TranslatableResult<serde_json::Value> {
        self.scalar_all(select.limit(1u64), field, locale)
            .await?
            .into_iter()
            .next()
            .ok_or(TranslatableError::NotFound)
    }

    /// Execute a prepared query, substituting translations per its hints.
    ///
    /// # Errors
    /// Surfaces database errors.
    pub async fn hydrate(&self, query: TranslatedQuery<E>) -> TranslatableResult<Vec<E::Model>> {
        let (select, hints) = query.into_parts();
        let mut models = select.all(&self.conn).await?;

        if let Some(locale) = hints.locale.as_deref() {
            if !models.is_empty() && !self.spec.fields.is_empty() {
                let keys: Vec<String> =
                    models.iter().map(Translatable::translation_key).collect();
                let grouped = group_rows(self.translation_rows(locale, &keys).await?);
                for model in &mut models {
                    if let Some(translations) = grouped.get(&model.translation_key()) {
                        for (field, content) in translations {
                            if self.spec.fields.contains(field) {
                                model.apply_translation(field, content);
                            }
                        }
                    }
                }
            }
        }
        Ok(models)
    }

    // ---- internals ----

    fn select_for(
        &self,
        criteria: &Criteria,
        order: Option<&OrderBy>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> TranslatableResult<Select<E>> {
        let mut select = E::find();

        for (name, value) in criteria.iter() {
            let col = self
                .fields
                .get(name)
                .ok_or_else(|| TranslatableError::UnknownField(name.to_owned()))?;
            select = select.filter(col.eq(value.clone()));
        }

        if let Some(order) = order {
            for (name, dir) in order.iter() {
                let col = self
                    .fields
                    .get(name)
                    .ok_or_else(|| TranslatableError::UnknownField(name.to_owned()))?;
                select = select.order_by(col, dir.into());
            }
        }

        if let Some(limit) = limit {
            select = select.limit(limit);
        }
        if let Some(offset) = offset {
            select = select.offset(offset);
        }

        Ok(select)
    }

    async fn translation_rows(
        &self,
        locale: &str,
        keys: &[String],
    ) -> TranslatableResult<Vec<TranslationRow>> {
        let mut stmt = Query::select();
        stmt.column(Alias::new("entity_id"))
            .column(Alias::new("field"))
            .column(Alias::new("content"))
            .from(Alias::new(self.spec.table.as_str()))
            .and_where(Expr::col(Alias::new("locale")).eq(locale))
            .and_where(Expr::col(Alias::new("entity_id")).is_in(keys.iter().map(String::as_str)));

        let backend = self.conn.get_database_backend();
        Ok(TranslationRow::find_by_statement(backend.build(&stmt))
            .all(&self.conn)
            .await?)
    }
}

fn group_rows(rows: Vec<TranslationRow>) -> HashMap<String, Vec<(String, String)>> {
    let mut grouped: HashMap<String, Vec<(String, String)>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.entity_id)
            .or_default()
            .push((row.field, row.content));
    }
    grouped
}

fn json_key(row: &serde_json::Value, key_field: &str) -> Option<String> {
    match row.get(key_field)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Highest-priority tag of an `Accept-Language` value (`"es-ES,es;q=0.9"`
/// → `"es-ES"`).
fn primary_language_tag(accept_language: &str) -> Option<String> {
    accept_language
        .split(',')
        .next()
        .and_then(|item| item.split(';').next())
        .map(|tag| tag.trim().to_owned())
        .filter(|tag| !tag.is_empty() && tag != "*")
}

#[cfg(test)]
mod tests {
    use super::*;

    mod post {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
        #[sea_orm(table_name = "posts")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            pub title: String,
            pub body: String,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    impl Translatable for post::Model {
        fn translation_key(&self) -> String {
            self.id.to_string()
        }

        fn apply_translation(&mut self, field: &str, content: &str) {
            match field {
                "title" => self.title = content.to_owned(),
                "body" => self.body = content.to_owned(),
                _ => {}
            }
        }
    }

    fn repository() -> TranslatableRepository<post::Entity> {
        let fields = FieldMap::new()
            .insert("id", post::Column::Id)
            .insert("title", post::Column::Title)
            .insert("body", post::Column::Body);
        let spec = TranslationSpec::for_table(
            "posts",
            "id",
            vec!["title".to_owned(), "body".to_owned()],
        );
        TranslatableRepository::new(DatabaseConnection::default(), fields, spec)
    }

    #[test]
    fn prepare_always_sets_the_fallback_hint() {
        let repo = repository();

        let query = repo.prepare(post::Entity::find(), None);
        assert!(query.hints().fallback);
        assert_eq!(query.hints().locale, None);

        let query = repo.prepare(post::Entity::find(), Some("es"));
        assert!(query.hints().fallback);
        assert_eq!(query.hints().locale.as_deref(), Some("es"));
    }

    #[test]
    fn locale_resolution_prefers_explicit_over_default() {
        let repo = repository();
        repo.set_default_locale("de");

        let query = repo.prepare(post::Entity::find(), None);
        assert_eq!(query.hints().locale.as_deref(), Some("de"));

        let query = repo.prepare(post::Entity::find(), Some("fr"));
        assert_eq!(query.hints().locale.as_deref(), Some("fr"));
    }

    #[test]
    fn locale_from_request_takes_the_primary_tag() {
        let repo = repository();

        repo.set_locale_from_request("es-ES,es;q=0.9,en;q=0.8");
        assert_eq!(repo.default_locale().as_deref(), Some("es-ES"));

        // Wildcards and blanks leave the default untouched.
        repo.set_locale_from_request("*");
        assert_eq!(repo.default_locale().as_deref(), Some("es-ES"));
        repo.set_locale_from_request("");
        assert_eq!(repo.default_locale().as_deref(), Some("es-ES"));
    }

    #[test]
    fn select_for_rejects_unknown_fields() {
        let repo = repository();

        let err = repo
            .select_for(&Criteria::new().eq("nope", 1), None, None, None)
            .unwrap_err();
        assert!(matches!(err, TranslatableError::UnknownField(f) if f == "nope"));

        let err = repo
            .select_for(
                &Criteria::new(),
                Some(&OrderBy::new().asc("mystery")),
                None,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, TranslatableError::UnknownField(_)));
    }

    #[test]
    fn field_map_lookup_is_case_insensitive() {
        let fields = FieldMap::<post::Entity>::new().insert("Title", post::Column::Title);
        assert!(fields.get("title").is_some());
        assert!(fields.get("TITLE").is_some());
        assert!(fields.get("body").is_none());
    }

    #[test]
    fn translation_spec_uses_side_table_convention() {
        let spec = TranslationSpec::for_table("posts", "id", vec![]);
        assert_eq!(spec.table, "posts_translations");
    }

    #[test]
    fn primary_language_tag_parsing() {
        assert_eq!(primary_language_tag("en"), Some("en".to_owned()));
        assert_eq!(
            primary_language_tag("es-ES,es;q=0.9"),
            Some("es-ES".to_owned())
        );
        assert_eq!(primary_language_tag("fr;q=0.5"), Some("fr".to_owned()));
        assert_eq!(primary_language_tag("*"), None);
        assert_eq!(primary_language_tag(""), None);
    }
}
