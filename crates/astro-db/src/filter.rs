//! Translates filter/sort/page descriptors into SQL with `QueryBuilder`.
//!
//! Every function appends to a query whose main table is aliased (`b` for
//! bodies, `a` for astronomers, `o` for observations). Filters start with
//! `WHERE TRUE` so each supplied filter is a plain `AND` clause; absent
//! filters add nothing.

use astro_core::query::{AstronomerFilter, BodyFilter, ObservationFilter};
use astro_core::{Page, Sort};
use sqlx::{Postgres, QueryBuilder};

/// Sortable body fields and their columns.
pub const BODY_SORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "b.id"),
    ("name", "b.name"),
    ("type", "b.body_type"),
    ("mass", "b.mass"),
    ("radius", "b.radius"),
    ("temperature", "b.temperature"),
    ("distance_from_earth", "b.distance_from_earth"),
    ("spectral_class", "b.spectral_class"),
    ("absolute_magnitude", "b.absolute_magnitude"),
    ("apparent_magnitude", "b.apparent_magnitude"),
    ("right_ascension", "b.right_ascension"),
    ("declination", "b.declination"),
    ("parent_id", "b.parent_id"),
    ("created_at", "b.created_at"),
    ("updated_at", "b.updated_at"),
];

pub const ASTRONOMER_SORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "a.id"),
    ("first_name", "a.first_name"),
    ("last_name", "a.last_name"),
    ("birth_date", "a.birth_date"),
    ("death_date", "a.death_date"),
    ("nationality", "a.nationality"),
    ("institution", "a.institution"),
    ("created_at", "a.created_at"),
];

/// Wraps a search term for `ILIKE`, matching `%`, `_` and `\` literally.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

pub fn push_body_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &BodyFilter) {
    qb.push(" WHERE TRUE");
    if let Some(name) = filter.name.as_deref().filter(|n| !n.is_empty()) {
        qb.push(" AND b.name ILIKE ").push_bind(like_pattern(name));
    }
    if let Some(body_type) = filter.body_type {
        qb.push(" AND b.body_type = ").push_bind(body_type.as_str());
    }
    if let Some(min) = filter.min_distance {
        qb.push(" AND b.distance_from_earth >= ").push_bind(min);
    }
    if let Some(max) = filter.max_distance {
        qb.push(" AND b.distance_from_earth <= ").push_bind(max);
    }
    if let Some(min) = filter.min_magnitude {
        qb.push(" AND b.apparent_magnitude >= ").push_bind(min);
    }
    if let Some(max) = filter.max_magnitude {
        qb.push(" AND b.apparent_magnitude <= ").push_bind(max);
    }
    if let Some(class) = filter.spectral_class {
        qb.push(" AND b.spectral_class = ").push_bind(class.as_str());
    }
    match filter.has_observations {
        Some(true) => {
            qb.push(" AND EXISTS (SELECT 1 FROM observations ob WHERE ob.celestial_body_id = b.id)");
        }
        Some(false) => {
            qb.push(
                " AND NOT EXISTS (SELECT 1 FROM observations ob WHERE ob.celestial_body_id = b.id)",
            );
        }
        None => {}
    }
}

pub fn push_astronomer_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &AstronomerFilter) {
    qb.push(" WHERE TRUE");
    if let Some(name) = filter.name.as_deref().filter(|n| !n.is_empty()) {
        let pattern = like_pattern(name);
        qb.push(" AND (a.first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.last_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(nationality) = filter.nationality.as_deref().filter(|n| !n.is_empty()) {
        qb.push(" AND a.nationality = ").push_bind(nationality.to_string());
    }
    if let Some(institution) = filter.institution.as_deref().filter(|i| !i.is_empty()) {
        qb.push(" AND a.institution ILIKE ")
            .push_bind(like_pattern(institution));
    }
    if let Some(active) = filter.is_active {
        qb.push(" AND a.is_active = ").push_bind(active);
    }
    match filter.has_observations {
        Some(true) => {
            qb.push(" AND EXISTS (SELECT 1 FROM observations ob WHERE ob.astronomer_id = a.id)");
        }
        Some(false) => {
            qb.push(" AND NOT EXISTS (SELECT 1 FROM observations ob WHERE ob.astronomer_id = a.id)");
        }
        None => {}
    }
}

pub fn push_observation_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ObservationFilter) {
    qb.push(" WHERE TRUE");
    if let Some(id) = filter.astronomer_id {
        qb.push(" AND o.astronomer_id = ").push_bind(id);
    }
    if let Some(id) = filter.celestial_body_id {
        qb.push(" AND o.celestial_body_id = ").push_bind(id);
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND o.observation_date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND o.observation_date <= ").push_bind(end);
    }
}

/// Appends `ORDER BY`. The requested field is used only when it appears in
/// `columns`; `tiebreak` always follows so pagination is stable.
pub fn push_order(
    qb: &mut QueryBuilder<'_, Postgres>,
    sort: Option<&Sort>,
    columns: &[(&str, &str)],
    tiebreak: &str,
) {
    let column = sort.and_then(|s| {
        columns
            .iter()
            .find(|(field, _)| *field == s.field)
            .map(|(_, column)| (*column, s.order))
    });
    qb.push(" ORDER BY ");
    if let Some((column, order)) = column {
        qb.push(column).push(" ").push(order.as_sql()).push(", ");
    }
    qb.push(tiebreak);
}

pub fn push_page(qb: &mut QueryBuilder<'_, Postgres>, page: Page) {
    qb.push(" LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.skip);
}
