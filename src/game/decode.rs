//! Tolerant game state decoder
//!
//! Turns a raw server payload into a [`WorldState`]. Only an unparseable
//! document or a missing `ongoingGame`/`myTank` rejects the whole message.
//! Every other field is extracted through a per-type field table: a missing
//! or wrong-typed value keeps the previous value (or the type's default) and
//! produces a [`FieldDiagnostic`].

use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};
use tracing::warn;

use crate::ws::protocol::keys;

use super::state::{Shell, Tank, TankId, Wall, WorldState};

/// Message-level decode failures. The message is discarded, the session continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("missing required field: {0}")]
    MissingField(String),
}

/// What was wrong with a single field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldIssue {
    /// Key absent; previous value or default kept
    Missing,
    /// Value present with the wrong type; previous value or default kept
    WrongType(Value),
    /// Negative geometry. Accepted as-is, only flagged.
    Negative(f64),
    /// Tank id already used by an earlier list entry, which was replaced
    DuplicateId(TankId),
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldIssue::Missing => write!(f, "missing"),
            FieldIssue::WrongType(value) => write!(f, "invalid value {value}"),
            FieldIssue::Negative(value) => write!(f, "negative value {value} accepted"),
            FieldIssue::DuplicateId(id) => write!(f, "duplicate id {id}, earlier entry replaced"),
        }
    }
}

/// Non-fatal problem with one field of a payload
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDiagnostic {
    /// Dotted path, e.g. `myTank.heading` or `walls[2].width`
    pub path: String,
    pub issue: FieldIssue,
}

/// Decoded state plus every field-level problem encountered
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeReport {
    pub state: WorldState,
    pub diagnostics: Vec<FieldDiagnostic>,
}

/// Result of applying one field setter
enum Extracted {
    Set,
    SetNegative(f64),
    WrongType,
}

/// One row of a field table: key name and how to store it
struct Field<T> {
    key: &'static str,
    apply: fn(&mut T, &Value) -> Extracted,
}

fn set_number(slot: &mut f64, value: &Value) -> Extracted {
    match value.as_f64() {
        Some(n) => {
            *slot = n;
            Extracted::Set
        }
        None => Extracted::WrongType,
    }
}

/// Like [`set_number`], but flags (without rejecting) negative values
fn set_geometry(slot: &mut f64, value: &Value) -> Extracted {
    match set_number(slot, value) {
        Extracted::Set if *slot < 0.0 => Extracted::SetNegative(*slot),
        other => other,
    }
}

fn set_bool(slot: &mut bool, value: &Value) -> Extracted {
    match value.as_bool() {
        Some(b) => {
            *slot = b;
            Extracted::Set
        }
        None => Extracted::WrongType,
    }
}

fn set_id(slot: &mut TankId, value: &Value) -> Extracted {
    match value.as_i64() {
        Some(id) => {
            *slot = id;
            Extracted::Set
        }
        None => Extracted::WrongType,
    }
}

fn set_opt_bool(slot: &mut Option<bool>, value: &Value) -> Extracted {
    match value.as_bool() {
        Some(b) => {
            *slot = Some(b);
            Extracted::Set
        }
        None => Extracted::WrongType,
    }
}

fn set_opt_int(slot: &mut Option<i64>, value: &Value) -> Extracted {
    match value.as_i64() {
        Some(n) => {
            *slot = Some(n);
            Extracted::Set
        }
        None => Extracted::WrongType,
    }
}

fn set_opt_string(slot: &mut Option<String>, value: &Value) -> Extracted {
    match value.as_str() {
        Some(s) => {
            *slot = Some(s.to_string());
            Extracted::Set
        }
        None => Extracted::WrongType,
    }
}

const MY_TANK_FIELDS: &[Field<Tank>] = &[
    Field { key: keys::ID, apply: |t, v| set_id(&mut t.id, v) },
    Field { key: keys::X, apply: |t, v| set_geometry(&mut t.center_x, v) },
    Field { key: keys::Y, apply: |t, v| set_geometry(&mut t.center_y, v) },
    Field { key: keys::HEADING, apply: |t, v| set_number(&mut t.heading, v) },
    Field { key: keys::MOVING, apply: |t, v| set_bool(&mut t.is_moving, v) },
    Field { key: keys::ALIVE, apply: |t, v| set_bool(&mut t.is_alive, v) },
    Field { key: keys::CAN_SHOOT, apply: |t, v| set_opt_bool(&mut t.can_shoot, v) },
    Field { key: keys::NAME, apply: |t, v| set_opt_string(&mut t.name, v) },
    Field { key: keys::INFO, apply: |t, v| set_opt_string(&mut t.info, v) },
    Field { key: keys::KILLS, apply: |t, v| set_opt_int(&mut t.kills, v) },
    Field { key: keys::WINS, apply: |t, v| set_opt_int(&mut t.wins, v) },
];

const OTHER_TANK_FIELDS: &[Field<Tank>] = &[
    Field { key: keys::ID, apply: |t, v| set_id(&mut t.id, v) },
    Field { key: keys::X, apply: |t, v| set_geometry(&mut t.center_x, v) },
    Field { key: keys::Y, apply: |t, v| set_geometry(&mut t.center_y, v) },
    Field { key: keys::HEADING, apply: |t, v| set_number(&mut t.heading, v) },
    Field { key: keys::MOVING, apply: |t, v| set_bool(&mut t.is_moving, v) },
    Field { key: keys::ALIVE, apply: |t, v| set_bool(&mut t.is_alive, v) },
];

const SHELL_FIELDS: &[Field<Shell>] = &[
    Field { key: keys::SHOOTER_ID, apply: |s, v| set_id(&mut s.shooter_id, v) },
    Field { key: keys::X, apply: |s, v| set_geometry(&mut s.center_x, v) },
    Field { key: keys::Y, apply: |s, v| set_geometry(&mut s.center_y, v) },
    Field { key: keys::HEADING, apply: |s, v| set_number(&mut s.heading, v) },
];

const WALL_FIELDS: &[Field<Wall>] = &[
    Field { key: keys::WIDTH, apply: |w, v| set_geometry(&mut w.width, v) },
    Field { key: keys::HEIGHT, apply: |w, v| set_geometry(&mut w.height, v) },
    Field { key: keys::X, apply: |w, v| set_geometry(&mut w.center_x, v) },
    Field { key: keys::Y, apply: |w, v| set_geometry(&mut w.center_y, v) },
];

/// Collects diagnostics while walking a document
#[derive(Default)]
struct Diagnostics(Vec<FieldDiagnostic>);

impl Diagnostics {
    fn push(&mut self, path: String, issue: FieldIssue) {
        self.0.push(FieldDiagnostic { path, issue });
    }

    /// Apply every row of `table` from `object` onto `target`
    fn apply<T>(&mut self, target: &mut T, object: &Map<String, Value>, table: &[Field<T>], prefix: &str) {
        for field in table {
            match object.get(field.key) {
                None => self.push(format!("{prefix}.{}", field.key), FieldIssue::Missing),
                Some(value) => match (field.apply)(target, value) {
                    Extracted::Set => {}
                    Extracted::SetNegative(n) => {
                        self.push(format!("{prefix}.{}", field.key), FieldIssue::Negative(n))
                    }
                    Extracted::WrongType => self.push(
                        format!("{prefix}.{}", field.key),
                        FieldIssue::WrongType(value.clone()),
                    ),
                },
            }
        }
    }

    /// Decode a list of objects, each paired with its index in the document.
    /// `None` when the key is absent or not a list, in which case the caller
    /// keeps its previous collection.
    fn list<T: Default>(
        &mut self,
        root: &Map<String, Value>,
        key: &str,
        table: &[Field<T>],
    ) -> Option<Vec<(usize, T)>> {
        let items = match root.get(key) {
            None => {
                self.push(key.to_string(), FieldIssue::Missing);
                return None;
            }
            Some(Value::Array(items)) => items,
            Some(other) => {
                self.push(key.to_string(), FieldIssue::WrongType(other.clone()));
                return None;
            }
        };

        let mut decoded = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let prefix = format!("{key}[{index}]");
            match item.as_object() {
                Some(object) => {
                    let mut value = T::default();
                    self.apply(&mut value, object, table, &prefix);
                    decoded.push((index, value));
                }
                None => self.push(prefix, FieldIssue::WrongType(item.clone())),
            }
        }
        Some(decoded)
    }
}

/// Decodes server game state documents
pub struct StateDecoder;

impl StateDecoder {
    /// Decode `raw` on top of `previous`, logging every field-level problem
    pub fn decode(raw: &[u8], previous: Option<&WorldState>) -> Result<WorldState, DecodeError> {
        let report = Self::decode_with_report(raw, previous)?;
        for diagnostic in &report.diagnostics {
            warn!(path = %diagnostic.path, issue = %diagnostic.issue, "Invalid field in game state");
        }
        Ok(report.state)
    }

    /// Decode `raw` on top of `previous` and return the diagnostics instead of logging them
    pub fn decode_with_report(raw: &[u8], previous: Option<&WorldState>) -> Result<DecodeReport, DecodeError> {
        let document: Value = serde_json::from_slice(raw)
            .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;
        let Value::Object(root) = document else {
            return Err(DecodeError::MalformedPayload(
                "top level is not an object".to_string(),
            ));
        };

        let is_round_active = root
            .get(keys::ONGOING_GAME)
            .and_then(Value::as_bool)
            .ok_or_else(|| DecodeError::MissingField(keys::ONGOING_GAME.to_string()))?;
        let my_tank_object = root
            .get(keys::MY_TANK)
            .and_then(Value::as_object)
            .ok_or_else(|| DecodeError::MissingField(keys::MY_TANK.to_string()))?;

        let mut state = previous.cloned().unwrap_or_default();
        let mut diagnostics = Diagnostics::default();

        state.is_round_active = is_round_active;
        diagnostics.apply(&mut state.my_tank, my_tank_object, MY_TANK_FIELDS, keys::MY_TANK);

        if let Some(tanks) = diagnostics.list::<Tank>(&root, keys::OTHER_TANKS, OTHER_TANK_FIELDS) {
            let mut by_id = HashMap::with_capacity(tanks.len());
            for (index, tank) in tanks {
                let id = tank.id;
                if by_id.insert(id, tank).is_some() {
                    diagnostics.push(
                        format!("{}[{index}].{}", keys::OTHER_TANKS, keys::ID),
                        FieldIssue::DuplicateId(id),
                    );
                }
            }
            state.other_tanks = by_id;
        }
        if let Some(shells) = diagnostics.list(&root, keys::SHELLS, SHELL_FIELDS) {
            state.shells = shells.into_iter().map(|(_, shell)| shell).collect();
        }
        if let Some(walls) = diagnostics.list(&root, keys::WALLS, WALL_FIELDS) {
            state.walls = walls.into_iter().map(|(_, wall)| wall).collect();
        }

        Ok(DecodeReport {
            state,
            diagnostics: diagnostics.0,
        })
    }
}
