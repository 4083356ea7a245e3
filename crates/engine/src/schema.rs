//! The sheet schema: which rule applies to each column of each named sheet,
//! and which sheets hold derived content.
//!
//! The schema is data. It is parsed once at startup, validators with fixed
//! parameters are built eagerly (so a bad bound or date format fails
//! immediately), and the dependency graph between sheets is checked for
//! cycles.
//!
//! # Edge Direction
//!
//! ```text
//! A → B  means  "B depends on A"  (B reads A's rows)
//! ```

use std::collections::{HashSet, VecDeque};

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::validation::Validator;

const BUILTIN_SCHEMA: &str = include_str!("../schema/guild.toml");

/// Rule for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRule {
    /// Unvalidated column.
    Free,
    /// Validator fully determined by the schema (date, integer range).
    Fixed(Validator),
    /// Value must appear among the non-empty values of another sheet.
    ValueSet { sheet: String },
}

/// How a sheet's derived content is computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivedRule {
    /// Column 0 holds an item key; each further column is an owner named by
    /// its header and receives the summed quantity of that item in `source`
    /// rows whose owner column names that owner.
    OwnerTotals {
        source: String,
        item_column: usize,
        quantity_column: usize,
        owner_column: usize,
    },
}

impl DerivedRule {
    pub fn source(&self) -> &str {
        match self {
            DerivedRule::OwnerTotals { source, .. } => source,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetSchema {
    pub columns: Vec<ColumnRule>,
    pub derived: Option<DerivedRule>,
}

impl SheetSchema {
    /// Sheets this sheet reads, without duplicates, in first-use order.
    pub fn dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = Vec::new();
        let referenced = self
            .columns
            .iter()
            .filter_map(|rule| match rule {
                ColumnRule::ValueSet { sheet } => Some(sheet.as_str()),
                _ => None,
            })
            .chain(self.derived.as_ref().map(DerivedRule::source));

        for name in referenced {
            if !deps.contains(&name) {
                deps.push(name);
            }
        }
        deps
    }
}

/// Validated sheet schema.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    sheets: FxHashMap<String, SheetSchema>,
}

impl Schema {
    /// Build a schema from per-sheet entries, rejecting duplicate names and
    /// dependency cycles.
    pub fn new(entries: Vec<(String, SheetSchema)>) -> Result<Self> {
        let mut sheets = FxHashMap::default();
        for (name, sheet) in entries {
            if sheets.contains_key(&name) {
                return Err(ConfigError::InvalidSchema(format!(
                    "sheet {name:?} is defined more than once"
                )));
            }
            sheets.insert(name, sheet);
        }

        let schema = Self { sheets };
        if let Some(cycle) = schema.find_cycle() {
            return Err(ConfigError::CyclicSchema(cycle));
        }
        Ok(schema)
    }

    /// The schema shipped with the application.
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_SCHEMA)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let file: SchemaFile =
            toml::from_str(text).map_err(|e| ConfigError::InvalidSchema(e.to_string()))?;

        let mut entries = Vec::with_capacity(file.sheets.len());
        for spec in file.sheets {
            let columns = spec
                .columns
                .into_iter()
                .map(ColumnSpec::into_rule)
                .collect::<Result<Vec<_>>>()?;
            let derived = spec.derived.map(DerivedSpec::into_rule);
            entries.push((spec.name, SheetSchema { columns, derived }));
        }
        Self::new(entries)
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetSchema> {
        self.sheets.get(name)
    }

    pub fn dependencies(&self, name: &str) -> Vec<&str> {
        self.sheet(name)
            .map(SheetSchema::dependencies)
            .unwrap_or_default()
    }

    /// Sheets that read `name` directly, sorted by name.
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        let mut dependents: Vec<&str> = self
            .sheets
            .iter()
            .filter(|(_, sheet)| sheet.dependencies().contains(&name))
            .map(|(n, _)| n.as_str())
            .collect();
        dependents.sort_unstable();
        dependents
    }

    /// Every sheet that reads `name` directly or through other sheets,
    /// sorted by name. `name` itself is never included.
    pub fn transitive_dependents(&self, name: &str) -> Vec<&str> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = self.dependents(name).into();

        while let Some(next) = queue.pop_front() {
            if next == name || !seen.insert(next) {
                continue;
            }
            queue.extend(self.dependents(next));
        }

        let mut dependents: Vec<&str> = seen.into_iter().collect();
        dependents.sort_unstable();
        dependents
    }

    /// Order `names` so every sheet comes after the sheets it depends on.
    ///
    /// Uses Kahn's algorithm restricted to the given names; ties keep their
    /// input order, so the result is deterministic.
    pub fn recalc_order<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
        let names: Vec<&'a str> = names.into_iter().collect();
        let present: HashSet<&str> = names.iter().copied().collect();

        let mut in_degree: FxHashMap<&str, usize> = FxHashMap::default();
        for &name in &names {
            let count = self
                .dependencies(name)
                .into_iter()
                .filter(|dep| *dep != name && present.contains(*dep))
                .count();
            in_degree.insert(name, count);
        }

        let mut queue: VecDeque<&'a str> = names
            .iter()
            .copied()
            .filter(|n| in_degree.get(n) == Some(&0))
            .collect();
        let mut order = Vec::with_capacity(names.len());
        let mut placed: HashSet<&str> = HashSet::new();

        while let Some(name) = queue.pop_front() {
            if !placed.insert(name) {
                continue;
            }
            order.push(name);
            for &candidate in &names {
                if placed.contains(candidate) || !self.dependencies(candidate).contains(&name) {
                    continue;
                }
                if let Some(degree) = in_degree.get_mut(candidate) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        queue.push_back(candidate);
                    }
                }
            }
        }

        // Unreachable for a validated schema; keep every sheet regardless.
        for &name in &names {
            if !placed.contains(name) {
                order.push(name);
            }
        }
        order
    }

    /// Depth-first search for a dependency cycle. Returns the cycle path with
    /// the first sheet repeated at the end.
    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut roots: Vec<&str> = self.sheets.keys().map(String::as_str).collect();
        roots.sort_unstable();

        let mut done: HashSet<&str> = HashSet::new();
        for root in roots {
            let mut path = Vec::new();
            if self.cycle_dfs(root, &mut done, &mut path) {
                return Some(path.into_iter().map(str::to_string).collect());
            }
        }
        None
    }

    fn cycle_dfs<'a>(
        &'a self,
        current: &'a str,
        done: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> bool {
        if let Some(start) = path.iter().position(|n| *n == current) {
            path.drain(..start);
            path.push(current);
            return true;
        }
        if done.contains(current) {
            return false;
        }

        path.push(current);
        for dep in self.dependencies(current) {
            if self.cycle_dfs(dep, done, path) {
                return true;
            }
        }
        path.pop();
        done.insert(current);
        false
    }
}

// ============================================================================
// TOML descriptors
// ============================================================================

#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default, rename = "sheet")]
    sheets: Vec<SheetSpec>,
}

#[derive(Debug, Deserialize)]
struct SheetSpec {
    name: String,
    #[serde(default)]
    columns: Vec<ColumnSpec>,
    #[serde(default)]
    derived: Option<DerivedSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
enum ColumnSpec {
    Free,
    Date { format: String },
    IntRange { min: i64, max: i64 },
    ValueSet { sheet: String },
}

impl ColumnSpec {
    fn into_rule(self) -> Result<ColumnRule> {
        Ok(match self {
            ColumnSpec::Free => ColumnRule::Free,
            ColumnSpec::Date { format } => ColumnRule::Fixed(Validator::from_date_format(&format)?),
            ColumnSpec::IntRange { min, max } => {
                ColumnRule::Fixed(Validator::from_int_range(min, max)?)
            }
            ColumnSpec::ValueSet { sheet } => ColumnRule::ValueSet { sheet },
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum DerivedSpec {
    OwnerTotals {
        source: String,
        item_column: usize,
        quantity_column: usize,
        owner_column: usize,
    },
}

impl DerivedSpec {
    fn into_rule(self) -> DerivedRule {
        match self {
            DerivedSpec::OwnerTotals {
                source,
                item_column,
                quantity_column,
                owner_column,
            } => DerivedRule::OwnerTotals {
                source,
                item_column,
                quantity_column,
                owner_column,
            },
        }
    }
}
