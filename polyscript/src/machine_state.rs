//! Persistent object memory
//!
//! Memory blocks name an object; `Get` and `Set` read and write that object's
//! state variables. Only the serialized defaults persist. Live variables are
//! rebuilt from them whenever state is loaded or reloaded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockKind};
use crate::error::{Error, Result};
use crate::localization::localize;
use crate::registry::create_block;
use crate::run_view::RunView;

/// State of one object.
#[derive(Debug, Clone, Default)]
pub struct ObjectState {
    pub state_variables: BTreeMap<String, Block>,
    pub defaults: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize)]
struct ObjectRecord {
    #[serde(default)]
    defaults: BTreeMap<String, String>,
}

impl ObjectState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serialize(&self) -> Result<String> {
        let record = ObjectRecord {
            defaults: self.defaults.clone(),
        };
        Ok(serde_json::to_string(&record)?)
    }

    /// Parses one object and seeds its variables from the defaults.
    pub fn deserialize(serial: &str) -> Result<Self> {
        let record: ObjectRecord = serde_json::from_str(serial)?;
        let mut object = Self {
            state_variables: BTreeMap::new(),
            defaults: record.defaults,
        };
        object.reload();
        Ok(object)
    }

    /// Resets the live variables to the defaults.
    pub fn reload(&mut self) {
        self.state_variables = self
            .defaults
            .iter()
            .map(|(name, serial)| (name.clone(), create_block(serial)))
            .collect();
    }
}

fn check_storable(name: &str, value: &Block) -> Result<()> {
    match value.kind() {
        BlockKind::Data | BlockKind::Code => Err(Error::UnsupportedStateValue(name.to_owned())),
        _ => Ok(()),
    }
}

/// Every object known to a machine, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MachineState {
    pub objects: BTreeMap<String, ObjectState>,
}

impl MachineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON object mapping each id to the JSON text of its defaults.
    pub fn serialize(&self) -> Result<String> {
        let mut objects = BTreeMap::new();
        for (id, object) in &self.objects {
            objects.insert(id.clone(), object.serialize()?);
        }
        Ok(serde_json::to_string(&objects)?)
    }

    /// Parses serialized state. Malformed text yields an empty state.
    pub fn deserialize(serial: &str) -> Self {
        if serial.trim().is_empty() {
            return Self::new();
        }
        match Self::parse(serial) {
            Ok(state) => state,
            Err(err) => {
                log::warn!("failed to parse serialized machine state {}: {}", serial, err);
                Self::new()
            }
        }
    }

    fn parse(serial: &str) -> Result<Self> {
        let objects: BTreeMap<String, String> = serde_json::from_str(serial)?;
        let mut state = Self::new();
        for (id, object) in objects {
            state.objects.insert(id, ObjectState::deserialize(&object)?);
        }
        Ok(state)
    }

    /// Rebuilds every object's variables from its defaults.
    pub fn reload(&mut self) {
        for object in self.objects.values_mut() {
            object.reload();
        }
    }

    pub fn get_object_state(&self, object_id: &str) -> Option<&ObjectState> {
        self.objects.get(object_id)
    }

    pub fn create_object_state(&mut self, object_id: &str) -> &mut ObjectState {
        self.objects.entry(object_id.to_owned()).or_default()
    }

    /// Sets or, with `None`, deletes a state variable. Observers hear about
    /// actual changes only.
    pub fn set_state_variable(
        &mut self,
        object_id: &str,
        name: &str,
        value: Option<Block>,
        run_view: Option<&dyn RunView>,
    ) -> Result<()> {
        if let Some(value) = &value {
            check_storable(name, value)?;
        }
        let object = self.create_object_state(object_id);

        match value {
            None => {
                object.state_variables.remove(name);
            }
            Some(value) => {
                let changed = object
                    .state_variables
                    .get(name)
                    .is_none_or(|old| !value.equals(old));
                if changed {
                    if let Some(view) = run_view {
                        view.memory_changed(object_id, name, &value);
                    }
                }
                object.state_variables.insert(name.to_owned(), value);
            }
        }
        Ok(())
    }

    pub fn get_state_variable(&self, object_id: &str, name: &str) -> Block {
        let variable = self
            .objects
            .get(object_id)
            .and_then(|object| object.state_variables.get(name));
        match variable {
            Some(block) => block.clone(),
            None => {
                let display = localize(&format!("StateVariableNames.{}", name), name, &[]);
                Block::error(localize(
                    "Errors.getStateVariable",
                    "Could not find variable {{name}} of object {{objectId}}.",
                    &[("name", &display), ("objectId", object_id)],
                ))
            }
        }
    }

    pub fn set_state_default(&mut self, object_id: &str, name: &str, value: Option<&Block>) -> Result<()> {
        if let Some(value) = value {
            check_storable(name, value)?;
        }
        let object = self.create_object_state(object_id);
        match value {
            None => {
                object.defaults.remove(name);
            }
            Some(value) => {
                object.defaults.insert(name.to_owned(), value.serialize());
            }
        }
        Ok(())
    }

    /// Replaces the live variables of an object with nothing and records
    /// `inherited` then `variables` as defaults.
    pub fn set_state_defaults(
        &mut self,
        object_id: &str,
        inherited: &BTreeMap<String, Block>,
        variables: &BTreeMap<String, Block>,
    ) -> Result<()> {
        self.create_object_state(object_id).state_variables.clear();
        for (name, value) in inherited.iter().chain(variables) {
            self.set_state_default(object_id, name, Some(value))?;
        }
        Ok(())
    }

    pub fn get_state_default(&self, object_id: &str, name: &str) -> Block {
        let serial = self
            .objects
            .get(object_id)
            .and_then(|object| object.defaults.get(name));
        match serial {
            Some(serial) => create_block(serial),
            None => Block::error(localize(
                "Errors.getStateDefault",
                "Could not find default {{name}} of object {{objectId}}",
                &[("name", name), ("objectId", object_id)],
            )),
        }
    }

    /// Moves an object to a new id and rewrites memory blocks pointing at it.
    pub fn rename_object_state(&mut self, old_id: &str, new_id: &str) {
        if self.objects.contains_key(new_id) {
            log::warn!("overwriting {} with {}.", new_id, old_id);
        }
        let object = self.objects.remove(old_id).unwrap_or_default();
        self.objects.insert(new_id.to_owned(), object);

        let old_serial = Block::Memory(old_id.to_owned()).serialize();
        let new_serial = Block::Memory(new_id.to_owned()).serialize();

        for object in self.objects.values_mut() {
            for serial in object.defaults.values_mut() {
                if let Block::Memory(id) = create_block(serial) {
                    if id == old_id {
                        *serial = new_serial.clone();
                    }
                }
            }
            for block in object.state_variables.values_mut() {
                if let Block::Memory(id) = block {
                    if id == old_id {
                        *id = new_id.to_owned();
                    }
                }
            }
        }
        log::debug!("renamed object state {} to {}", old_serial, new_serial);
    }
}
