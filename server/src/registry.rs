//! Actor binding registry.
//!
//! Pairs each network-visible physics body with the scene object that renders it and the
//! [`NetworkId`] remote peers know it by.
//!
//! Model
//! - Bindings live in a `SlotMap` arena. Two indices point into it: body handle -> key and
//!   scene object -> key. Nothing is stored inside engine-owned memory.
//! - The mapping is a bijection: a body and a scene object each appear in at most one
//!   binding.
//! - Network ids come from a counter that only moves forward. `unbind` and `clear` never
//!   rewind it, so an id is never handed out twice.
//!
//! Threading
//! - The registry is mutated only between ticks (spawn/destroy) and read during ticks, all
//!   on the simulation thread, so it carries no lock.

use std::collections::HashMap;

use shared::{BodyHandle, NetworkId};
use slotmap::{new_key_type, SlotMap};

use crate::scene::SceneObjectId;

new_key_type! {
    /// Arena key of a [`Binding`].
    pub struct BindingKey;
}

/// A network-visible (body, scene object) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    pub body: BodyHandle,
    pub scene_object: SceneObjectId,
    pub network_id: NetworkId,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// Either side of the requested pair is already bound.
    #[error("duplicate binding: body {body:?} or scene object {scene_object:?} is already bound")]
    DuplicateBinding {
        body: BodyHandle,
        scene_object: SceneObjectId,
    },
}

pub struct ActorBindingRegistry {
    bindings: SlotMap<BindingKey, Binding>,
    by_body: HashMap<BodyHandle, BindingKey>,
    by_scene: HashMap<SceneObjectId, BindingKey>,
    by_network_id: HashMap<NetworkId, BindingKey>,
    next_id: NetworkId,
}

impl Default for ActorBindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorBindingRegistry {
    pub fn new() -> Self {
        Self {
            bindings: SlotMap::with_key(),
            by_body: HashMap::new(),
            by_scene: HashMap::new(),
            by_network_id: HashMap::new(),
            next_id: NetworkId::FIRST,
        }
    }

    /// Bind `body` to `scene_object` and assign the next network id.
    ///
    /// Fails without consuming an id if either side is already bound.
    pub fn bind(
        &mut self,
        body: BodyHandle,
        scene_object: SceneObjectId,
    ) -> Result<NetworkId, BindingError> {
        if self.by_body.contains_key(&body) || self.by_scene.contains_key(&scene_object) {
            return Err(BindingError::DuplicateBinding { body, scene_object });
        }

        let network_id = self.next_id;
        self.next_id = network_id.next();

        let key = self.bindings.insert(Binding {
            body,
            scene_object,
            network_id,
        });
        self.by_body.insert(body, key);
        self.by_scene.insert(scene_object, key);
        self.by_network_id.insert(network_id, key);

        Ok(network_id)
    }

    /// Hot-path lookup. `None` means the body is not network-visible.
    #[inline]
    pub fn resolve(&self, body: BodyHandle) -> Option<&Binding> {
        self.by_body
            .get(&body)
            .and_then(|key| self.bindings.get(*key))
    }

    /// Remove the binding of `body`, returning it.
    pub fn unbind(&mut self, body: BodyHandle) -> Option<Binding> {
        let key = self.by_body.remove(&body)?;
        let binding = self.bindings.remove(key)?;
        self.by_scene.remove(&binding.scene_object);
        self.by_network_id.remove(&binding.network_id);
        Some(binding)
    }

    /// Inverse lookup used when spawning and when reporting on scene objects.
    pub fn network_id_of(&self, scene_object: SceneObjectId) -> Option<NetworkId> {
        self.by_scene
            .get(&scene_object)
            .and_then(|key| self.bindings.get(*key))
            .map(|b| b.network_id)
    }

    pub fn by_network_id(&self, network_id: NetworkId) -> Option<&Binding> {
        self.by_network_id
            .get(&network_id)
            .and_then(|key| self.bindings.get(*key))
    }

    /// Id the next successful `bind` will assign.
    pub fn next_network_id(&self) -> NetworkId {
        self.next_id
    }

    /// Drop every binding (world teardown). The id counter is kept.
    pub fn clear(&mut self) {
        self.bindings.clear();
        self.by_body.clear();
        self.by_scene.clear();
        self.by_network_id.clear();
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }
}
