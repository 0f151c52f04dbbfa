use crate::messages::wire::{field, object};
use crate::messages::{DecodeError, FromWire};
use crate::network::{ClientError, RestClient, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use tracing::{debug, info, instrument};

/// How many levels of substituted objects get their own references resolved
pub const MAX_REFERENCE_DEPTH: usize = 4;

const PAGE_PARAM: &str = "page";
const PAGES_FIELD: &str = "pages";

/// An item field holding a key into a sibling table of the response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub field: String,
    pub table: String,
}

impl Reference {
    pub fn new(field: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            table: table.into(),
        }
    }
}

/// Replace every referenced key in `item` with the entry it names in `body`.
///
/// Tables are objects keyed by the string form of the key. Null references
/// are left alone and unknown keys are an error. Substituted objects are
/// resolved with the same references, down to [`MAX_REFERENCE_DEPTH`].
pub fn resolve_references(
    item: &Value,
    body: &Map<String, Value>,
    references: &[Reference],
) -> std::result::Result<Value, DecodeError> {
    resolve_at_depth(item, body, references, 0)
}

fn resolve_at_depth(
    item: &Value,
    body: &Map<String, Value>,
    references: &[Reference],
    depth: usize,
) -> std::result::Result<Value, DecodeError> {
    let Value::Object(fields) = item else {
        return Ok(item.clone());
    };
    let mut resolved = fields.clone();

    for reference in references {
        let key = match fields.get(&reference.field) {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            // null, absent, or already embedded
            _ => continue,
        };
        let table = body
            .get(&reference.table)
            .and_then(Value::as_object)
            .ok_or_else(|| DecodeError::missing(&reference.table))?;
        let target = table.get(&key).ok_or_else(|| {
            DecodeError::invalid_value(
                &reference.field,
                format!("key {} not found in '{}'", key, reference.table),
            )
        })?;
        let target = if depth + 1 < MAX_REFERENCE_DEPTH {
            resolve_at_depth(target, body, references, depth + 1)?
        } else {
            target.clone()
        };
        resolved.insert(reference.field.clone(), target);
    }
    Ok(Value::Object(resolved))
}

/// Describes one paged listing endpoint
#[derive(Debug, Clone)]
pub struct PaginatorBuilder {
    client: RestClient,
    endpoint: String,
    items_field: String,
    references: Vec<Reference>,
    params: Map<String, Value>,
    authenticated: bool,
}

impl PaginatorBuilder {
    pub fn new(client: RestClient, endpoint: impl Into<String>, items_field: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            items_field: items_field.into(),
            references: Vec::new(),
            params: Map::new(),
            authenticated: false,
        }
    }

    pub fn reference(mut self, field: impl Into<String>, table: impl Into<String>) -> Self {
        self.references.push(Reference::new(field, table));
        self
    }

    /// A parameter sent with every page request
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    pub fn build<T: FromWire>(self) -> Paginator<T> {
        Paginator {
            client: self.client,
            endpoint: self.endpoint,
            items_field: self.items_field,
            references: self.references,
            params: self.params,
            authenticated: self.authenticated,
            next_page: AtomicU32::new(0),
            end_reached: AtomicBool::new(false),
            total_pages: Mutex::new(None),
            _items: PhantomData,
        }
    }
}

/// A lazy cursor over one paged listing.
///
/// `get_page(None)` claims the next page number before the request is sent,
/// so the cursor moves once per call whatever the outcome. Running several
/// auto-advance calls at once is safe but the pages may complete out of
/// order.
pub struct Paginator<T> {
    client: RestClient,
    endpoint: String,
    items_field: String,
    references: Vec<Reference>,
    params: Map<String, Value>,
    authenticated: bool,
    next_page: AtomicU32,
    end_reached: AtomicBool,
    total_pages: Mutex<Option<u32>>,
    _items: PhantomData<fn() -> T>,
}

impl<T: FromWire> Paginator<T> {
    /// Fetch page `page`, or the next page when `None`.
    ///
    /// In auto-advance mode the server's "no more pages" error becomes an
    /// empty page and marks the listing as ended. An explicit page never
    /// changes the cursor and returns every error as is.
    #[instrument(level = "debug", skip(self), fields(endpoint = %self.endpoint))]
    pub async fn get_page(&self, page: Option<u32>) -> Result<Vec<T>> {
        if let Some(page) = page {
            return self.fetch(page).await;
        }

        let page = self.next_page.fetch_add(1, Ordering::SeqCst);
        match self.fetch(page).await {
            Err(ClientError::Application(err)) if err.is_pagination_exhausted() => {
                if !self.end_reached.swap(true, Ordering::SeqCst) {
                    info!("{} exhausted at page {}", self.endpoint, page);
                }
                Ok(Vec::new())
            }
            other => other,
        }
    }

    pub async fn next_page(&self) -> Result<Vec<T>> {
        self.get_page(None).await
    }

    /// Walk the remaining pages until the listing ends or a page comes back empty
    pub async fn collect_remaining(&self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        loop {
            let page = self.get_page(None).await?;
            if page.is_empty() {
                break;
            }
            items.extend(page);
        }
        Ok(items)
    }

    async fn fetch(&self, page: u32) -> Result<Vec<T>> {
        let mut params = self.params.clone();
        params.insert(PAGE_PARAM.to_string(), Value::from(page));
        let body = self
            .client
            .get(&self.endpoint, params, self.authenticated)
            .await?;

        let obj = object(&body, "page")?;
        if let Some(pages) = obj
            .get(PAGES_FIELD)
            .and_then(Value::as_u64)
            .and_then(|p| u32::try_from(p).ok())
        {
            if let Ok(mut total) = self.total_pages.lock() {
                *total = Some(pages);
            }
        }

        let items = field(obj, &self.items_field)?
            .as_array()
            .ok_or_else(|| DecodeError::invalid_type(&self.items_field, "array"))?;
        debug!("Page {} of {} has {} items", page, self.endpoint, items.len());

        let decoded = items
            .iter()
            .map(|item| T::from_wire(&resolve_references(item, obj, &self.references)?))
            .collect::<std::result::Result<Vec<T>, DecodeError>>()?;
        Ok(decoded)
    }
}

impl<T> Paginator<T> {
    /// The page the next auto-advance call will request
    pub fn current_page(&self) -> u32 {
        self.next_page.load(Ordering::SeqCst)
    }

    /// Set once the server reports there are no more pages; never cleared
    pub fn end_reached(&self) -> bool {
        self.end_reached.load(Ordering::SeqCst)
    }

    /// Page count from the most recent response, if the server sent one
    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages.lock().ok().and_then(|total| *total)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl<T> fmt::Debug for Paginator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paginator")
            .field("endpoint", &self.endpoint)
            .field("next_page", &self.current_page())
            .field("end_reached", &self.end_reached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_refs() -> Vec<Reference> {
        vec![Reference::new("host", "users"), Reference::new("away", "users")]
    }

    #[test]
    fn test_resolves_numeric_keys() {
        let body = json!({"users": {"3": {"id": 3, "username": "artemis"}}});
        let item = json!({"id": 1, "host": 3, "away": null});
        let resolved = resolve_references(&item, body.as_object().unwrap(), &user_refs()).unwrap();
        assert_eq!(resolved["host"]["username"], "artemis");
        assert_eq!(resolved["away"], Value::Null);
    }

    #[test]
    fn test_unknown_key_is_an_error() {
        let body = json!({"users": {"3": {"id": 3}}});
        let item = json!({"host": 4});
        let err = resolve_references(&item, body.as_object().unwrap(), &user_refs()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidValue { ref field, .. } if field == "host"));
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let body = json!({"games": []});
        let item = json!({"host": 4});
        let err = resolve_references(&item, body.as_object().unwrap(), &user_refs()).unwrap_err();
        assert_eq!(err, DecodeError::missing("users"));
    }

    #[test]
    fn test_nested_references() {
        let refs = vec![Reference::new("game", "games"), Reference::new("host", "users")];
        let body = json!({
            "games": {"10": {"id": 10, "host": 3}},
            "users": {"3": {"id": 3, "username": "artemis"}}
        });
        let item = json!({"id": 1, "game": 10});
        let resolved = resolve_references(&item, body.as_object().unwrap(), &refs).unwrap();
        assert_eq!(resolved["game"]["host"]["username"], "artemis");
    }

    #[test]
    fn test_depth_is_bounded() {
        let refs = vec![Reference::new("next", "nodes")];
        let body = json!({"nodes": {"1": {"id": 1, "next": 1}}});
        let item = json!({"next": 1});
        let resolved = resolve_references(&item, body.as_object().unwrap(), &refs).unwrap();

        let mut node = &resolved;
        for _ in 0..MAX_REFERENCE_DEPTH {
            node = &node["next"];
            assert!(node.is_object());
        }
        assert_eq!(node["next"], json!(1));
    }
}
