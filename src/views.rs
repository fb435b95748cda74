// 🪟 View Layer - named projections of validated entities
//
// Every entity declares, per view, which paths are excluded, which are
// renamed and which get an output transform. Nothing is inferred, and
// rendering never normalizes or validates.

use crate::attributes::parse_timestamp;
use crate::error::Result;
use crate::schema::{process, Entity, Schema};
use serde_json::{Map, Value};

// ============================================================================
// VIEWS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// Every stored and computed field. In-process use only.
    Internal,
    /// Secrets and sensitive sub-fields removed
    Public,
    /// External naming convention and formats
    Wire,
}

impl View {
    pub const ALL: [View; 3] = [View::Internal, View::Public, View::Wire];

    pub fn name(&self) -> &'static str {
        match self {
            View::Internal => "internal",
            View::Public => "public",
            View::Wire => "wire",
        }
    }

    /// May this view be sent outside the process?
    pub fn crosses_boundary(&self) -> bool {
        !matches!(self, View::Internal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Timestamp -> `YYYY-MM-DD` (lossy)
    DateOnly,
}

impl Transform {
    fn apply(&self, value: &mut Value) {
        match self {
            Transform::DateOnly => {
                if let Some(ts) = value.as_str().and_then(parse_timestamp) {
                    *value = Value::String(ts.format("%Y-%m-%d").to_string());
                }
            }
        }
    }
}

// ============================================================================
// VIEW SPEC
// ============================================================================

/// Declared shape of one view. Paths are dotted and descend into lists.
#[derive(Debug, Clone)]
pub struct ViewSpec {
    exclude: Vec<&'static str>,
    rename: Vec<(&'static str, &'static str)>,
    transforms: Vec<(&'static str, Transform)>,
    computed: bool,
}

impl Default for ViewSpec {
    fn default() -> Self {
        ViewSpec {
            exclude: Vec::new(),
            rename: Vec::new(),
            transforms: Vec::new(),
            computed: true,
        }
    }
}

impl ViewSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude(mut self, path: &'static str) -> Self {
        self.exclude.push(path);
        self
    }

    /// Rename the last segment of `path` to `to`
    pub fn rename(mut self, path: &'static str, to: &'static str) -> Self {
        self.rename.push((path, to));
        self
    }

    /// Rename every aliased field of `schema` to its alias
    pub fn with_aliases(mut self, schema: &Schema) -> Self {
        self.rename.extend(schema.aliases());
        self
    }

    pub fn transform(mut self, path: &'static str, transform: Transform) -> Self {
        self.transforms.push((path, transform));
        self
    }

    pub fn without_computed(mut self) -> Self {
        self.computed = false;
        self
    }

    pub fn excludes(&self, path: &str) -> bool {
        self.exclude.iter().any(|p| *p == path)
    }

    /// Top-level output key -> source field name
    fn source_of<'a>(&self, key: &'a str) -> &'a str {
        self.rename
            .iter()
            .find(|(path, to)| *to == key && !path.contains('.'))
            .map(|(path, _)| *path)
            .unwrap_or(key)
    }
}

/// An entity with declared views and (optionally) computed fields
pub trait Viewable: Entity {
    /// Names of the computed fields `computed` emits
    const COMPUTED: &'static [&'static str] = &[];

    /// Derived values, recomputed on every call
    fn computed(&self) -> Vec<(&'static str, Value)> {
        Vec::new()
    }

    fn view_spec(view: View) -> ViewSpec;
}

// ============================================================================
// RENDERING
// ============================================================================

pub fn render<E: Viewable>(entity: &E, view: View) -> Map<String, Value> {
    let spec = E::view_spec(view);

    let mut record = entity.to_record();
    if spec.computed {
        for (name, value) in entity.computed() {
            record.insert(name.to_string(), value);
        }
    }

    let mut root = Value::Object(record);

    for (path, transform) in &spec.transforms {
        visit(&mut root, &segments(path), &mut |map, key| {
            if let Some(value) = map.get_mut(key) {
                transform.apply(value);
            }
        });
    }

    for path in &spec.exclude {
        visit(&mut root, &segments(path), &mut |map, key| {
            map.remove(key);
        });
    }

    for (path, to) in &spec.rename {
        visit(&mut root, &segments(path), &mut |map, key| {
            if let Some(value) = map.remove(key) {
                map.insert(to.to_string(), value);
            }
        });
    }

    match root {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub fn render_value<E: Viewable>(entity: &E, view: View) -> Value {
    Value::Object(render(entity, view))
}

pub fn render_all<E: Viewable>(entities: &[E], view: View) -> Vec<Value> {
    entities.iter().map(|e| render_value(e, view)).collect()
}

/// Re-parse a wire record: aliases back to canonical names, computed fields
/// dropped, then the full pipeline.
pub fn parse_aliased<E: Viewable>(wire: &Map<String, Value>) -> Result<E> {
    let schema = E::schema();
    let spec = E::view_spec(View::Wire);

    let mut raw = Map::new();
    for (key, value) in wire {
        let source = spec.source_of(key);
        if E::COMPUTED.iter().any(|name| *name == source) {
            continue;
        }
        let canonical = schema
            .resolve_key(source)
            .map(|f| f.name)
            .unwrap_or(source);
        raw.insert(canonical.to_string(), value.clone());
    }

    process::<E>(&Value::Object(raw))
}

fn segments(path: &str) -> Vec<&str> {
    path.split('.').collect()
}

fn visit(value: &mut Value, path: &[&str], f: &mut dyn FnMut(&mut Map<String, Value>, &str)) {
    match value {
        Value::Array(items) => {
            for item in items {
                visit(item, path, f);
            }
        }
        Value::Object(map) => match path {
            [] => {}
            [last] => f(map, *last),
            [head, rest @ ..] => {
                if let Some(child) = map.get_mut(*head) {
                    visit(child, rest, f);
                }
            }
        },
        _ => {}
    }
}

// ============================================================================
// TESTS
// ============================================================================
