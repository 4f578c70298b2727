//! Query Builder: translates raw list parameters into a filter, a sort order
//! and pagination values.
//!
//! Every input is accepted. Numeric parameters are coerced from text and may
//! end up NaN, negative or fractional; those values are carried literally and
//! only clamped by the storage adapters.

use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use utoipa::{IntoParams, ToSchema};

use crate::models::{CREATED_AT_FIELD, Product};

/// Page used when `page` is absent
pub const DEFAULT_PAGE: f64 = 1.0;

/// Page size used when `limit` is absent
pub const DEFAULT_LIMIT: f64 = 10.0;

/// Recognized query parameters for `GET /products`, exactly as received
#[derive(Debug, Clone, Default, PartialEq, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// 1-based page number (default 1)
    pub page: Option<String>,
    /// Page size (default 10)
    pub limit: Option<String>,
    /// Case-insensitive substring of `name`
    pub search: Option<String>,
    /// Exact brand
    pub brand: Option<String>,
    /// Exact category
    pub category: Option<String>,
    /// Inclusive lower price bound, only applied together with `maxPrice`
    pub min_price: Option<String>,
    /// Inclusive upper price bound, only applied together with `minPrice`
    pub max_price: Option<String>,
    /// `priceLow`, `priceHigh` or `newest`; anything else leaves order to storage
    pub sort: Option<String>,
}

impl ListParams {
    /// Collect parameters from decoded query pairs.
    ///
    /// Unknown keys are ignored and the first occurrence of a repeated key wins,
    /// so no query string is ever rejected.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "page" => &mut params.page,
                "limit" => &mut params.limit,
                "search" => &mut params.search,
                "brand" => &mut params.brand,
                "category" => &mut params.category,
                "minPrice" => &mut params.min_price,
                "maxPrice" => &mut params.max_price,
                "sort" => &mut params.sort,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        params
    }
}

/// A number coerced from request text.
///
/// Follows the usual number-from-string rules of web runtimes: surrounding
/// whitespace is ignored, an empty string is zero, `0x`/`0o`/`0b` prefixes
/// and `Infinity` are understood, and anything unparsable becomes NaN.
///
/// Serializes as an integer when integral, as a float otherwise, and as
/// `null` when NaN or infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericParam(f64);

impl NumericParam {
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn parse(raw: &str) -> Self {
        Self(coerce_number(raw))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_nan(self) -> bool {
        self.0.is_nan()
    }
}

impl From<f64> for NumericParam {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl Serialize for NumericParam {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.0;
        if !value.is_finite() {
            serializer.serialize_none()
        } else if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            serializer.serialize_i64(value as i64)
        } else {
            serializer.serialize_f64(value)
        }
    }
}

fn coerce_number(raw: &str) -> f64 {
    let text = raw.trim();
    if text.is_empty() {
        return 0.0;
    }

    match text {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let radix = match text.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &text[2..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return f64::NAN;
        }
        return digits
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0.0, |acc, d| acc * radix as f64 + d as f64);
    }

    // Rust's float grammar also accepts "inf" and "nan", which must stay NaN here
    let decimal_only = text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !decimal_only {
        return f64::NAN;
    }
    text.parse().unwrap_or(f64::NAN)
}

/// Fields the builder filters and sorts on
pub mod fields {
    pub const NAME: &str = "name";
    pub const BRAND: &str = "brand";
    pub const CATEGORY: &str = "category";
    pub const PRICE: &str = "price";
}

/// One condition of a conjunctive filter
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCondition {
    /// `field` is a string containing `needle`, ignoring case
    Contains { field: &'static str, needle: String },
    /// `field` equals `value` (or is an array containing it)
    Equals { field: &'static str, value: String },
    /// `field` is a number within `[min, max]`
    Between {
        field: &'static str,
        min: f64,
        max: f64,
    },
}

impl FieldCondition {
    pub fn field(&self) -> &'static str {
        match self {
            FieldCondition::Contains { field, .. }
            | FieldCondition::Equals { field, .. }
            | FieldCondition::Between { field, .. } => field,
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        match self {
            FieldCondition::Contains { field, needle } => product
                .get_str(field)
                .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase())),
            FieldCondition::Equals { field, value } => match product.get(field) {
                Some(serde_json::Value::String(text)) => text == value,
                Some(serde_json::Value::Array(items)) => {
                    items.iter().any(|item| item.as_str() == Some(value.as_str()))
                }
                _ => false,
            },
            FieldCondition::Between { field, min, max } => product
                .get_f64(field)
                .is_some_and(|number| *min <= number && number <= *max),
        }
    }
}

/// Conjunction of field conditions; empty matches every product
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub conditions: Vec<FieldCondition>,
}

impl ProductFilter {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, product: &Product) -> bool {
        self.conditions.iter().all(|c| c.matches(product))
    }
}

/// The single active sort key of a list request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// `priceLow`
    PriceAscending,
    /// `priceHigh`
    PriceDescending,
    /// `newest`
    Newest,
}

impl SortOrder {
    /// Recognize a `sort` parameter; unknown values mean "unordered"
    pub fn from_param(raw: &str) -> Option<Self> {
        match raw {
            "priceLow" => Some(SortOrder::PriceAscending),
            "priceHigh" => Some(SortOrder::PriceDescending),
            "newest" => Some(SortOrder::Newest),
            _ => None,
        }
    }

    pub fn field(self) -> &'static str {
        match self {
            SortOrder::PriceAscending | SortOrder::PriceDescending => fields::PRICE,
            SortOrder::Newest => CREATED_AT_FIELD,
        }
    }

    /// 1 for ascending, -1 for descending
    pub fn direction(self) -> i32 {
        match self {
            SortOrder::PriceAscending => 1,
            SortOrder::PriceDescending | SortOrder::Newest => -1,
        }
    }

    /// Order two products; documents missing the key sort as the lowest value
    pub fn compare(self, a: &Product, b: &Product) -> Ordering {
        let ascending = match self {
            SortOrder::PriceAscending | SortOrder::PriceDescending => {
                match (a.get_f64(fields::PRICE), b.get_f64(fields::PRICE)) {
                    (Some(x), Some(y)) => x.total_cmp(&y),
                    (x, y) => x.is_some().cmp(&y.is_some()),
                }
            }
            SortOrder::Newest => a.created_at().cmp(&b.created_at()),
        };

        if self.direction() < 0 {
            ascending.reverse()
        } else {
            ascending
        }
    }
}

/// Per-request query specification
#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub sort: Option<SortOrder>,
    pub page: NumericParam,
    pub limit: NumericParam,
    /// `(page - 1) * limit`, unclamped
    pub skip: NumericParam,
}

impl ProductQuery {
    /// Documents to skip in storage: negative and NaN offsets skip nothing
    pub fn skip_count(&self) -> u64 {
        let skip = self.skip.value();
        if skip.is_finite() && skip > 0.0 {
            skip.trunc() as u64
        } else {
            0
        }
    }

    /// Storage page size: 0 means unbounded; a negative size caps at its magnitude
    pub fn page_size(&self) -> i64 {
        let limit = self.limit.value();
        if limit.is_finite() {
            limit.trunc() as i64
        } else {
            0
        }
    }

    /// `ceil(total / limit)`, NaN or infinite when `limit` is not a positive number
    pub fn total_pages(&self, total: u64) -> NumericParam {
        NumericParam::new((total as f64 / self.limit.value()).ceil())
    }
}

/// Returns the parameter when it is present and non-empty
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Build the query specification for a list request
pub fn build_query(params: &ListParams) -> ProductQuery {
    let mut conditions = Vec::new();

    if let Some(search) = present(&params.search) {
        conditions.push(FieldCondition::Contains {
            field: fields::NAME,
            needle: search.to_string(),
        });
    }

    if let Some(brand) = present(&params.brand) {
        conditions.push(FieldCondition::Equals {
            field: fields::BRAND,
            value: brand.to_string(),
        });
    }

    if let Some(category) = present(&params.category) {
        conditions.push(FieldCondition::Equals {
            field: fields::CATEGORY,
            value: category.to_string(),
        });
    }

    // Both bounds or no price filter at all
    if let (Some(min), Some(max)) = (present(&params.min_price), present(&params.max_price)) {
        conditions.push(FieldCondition::Between {
            field: fields::PRICE,
            min: NumericParam::parse(min).value(),
            max: NumericParam::parse(max).value(),
        });
    }

    let sort = params.sort.as_deref().and_then(SortOrder::from_param);

    let page = params
        .page
        .as_deref()
        .map_or(NumericParam::new(DEFAULT_PAGE), NumericParam::parse);
    let limit = params
        .limit
        .as_deref()
        .map_or(NumericParam::new(DEFAULT_LIMIT), NumericParam::parse);
    let skip = NumericParam::new((page.value() - 1.0) * limit.value());

    ProductQuery {
        filter: ProductFilter { conditions },
        sort,
        page,
        limit,
        skip,
    }
}
