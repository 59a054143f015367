//! Render-world collaborator.
//!
//! The bridge only needs a small surface from the scene graph: add an object, remove one
//! it added itself, and overwrite an object's display transform and position. Rendering
//! proper happens elsewhere. [`SceneGraph`] is the in-memory implementation used by the
//! headless server and by tests.

use nalgebra::Vector3;
use shared::SceneMatrix;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Identity of an object in the render world.
    pub struct SceneObjectId;
}

/// A renderable entity.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneObject {
    pub label: String,
    /// Model asset reference, e.g. a path relative to the shared media directory.
    pub model_ref: String,
    pub scale: Vector3<f32>,
    pub position: Vector3<f32>,
    pub transform: SceneMatrix,
}

impl SceneObject {
    pub fn new(label: impl Into<String>, model_ref: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            model_ref: model_ref.into(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            position: Vector3::zeros(),
            transform: SceneMatrix::IDENTITY,
        }
    }

    pub fn with_scale(mut self, scale: Vector3<f32>) -> Self {
        self.scale = scale;
        self
    }

    /// Place the object at `position` with identity orientation.
    pub fn at(mut self, position: Vector3<f32>) -> Self {
        self.position = position;
        self.transform = SceneMatrix::from_position(position);
        self
    }

    /// Place the object with a full display transform. The position follows its translation.
    pub fn with_transform(mut self, transform: SceneMatrix) -> Self {
        self.position = transform.translation();
        self.transform = transform;
        self
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("scene object `{0}` has no model reference")]
    MissingModel(String),

    #[error("render world is full ({0} objects)")]
    CapacityExceeded(usize),
}

pub trait RenderWorld {
    fn add_object(&mut self, object: SceneObject) -> Result<SceneObjectId, SceneError>;

    fn remove_object(&mut self, id: SceneObjectId) -> Option<SceneObject>;

    /// Returns `false` if `id` is unknown.
    fn set_transform(&mut self, id: SceneObjectId, transform: SceneMatrix) -> bool;

    /// Returns `false` if `id` is unknown.
    fn set_position(&mut self, id: SceneObjectId, position: Vector3<f32>) -> bool;

    fn get(&self, id: SceneObjectId) -> Option<&SceneObject>;
}

#[derive(Default)]
pub struct SceneGraph {
    objects: SlotMap<SceneObjectId, SceneObject>,
    capacity: Option<usize>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scene that refuses new objects once it holds `capacity`.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            objects: SlotMap::with_key(),
            capacity: Some(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: SceneObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SceneObjectId, &SceneObject)> {
        self.objects.iter()
    }
}

impl RenderWorld for SceneGraph {
    fn add_object(&mut self, object: SceneObject) -> Result<SceneObjectId, SceneError> {
        if object.model_ref.trim().is_empty() {
            return Err(SceneError::MissingModel(object.label));
        }
        if let Some(capacity) = self.capacity {
            if self.objects.len() >= capacity {
                return Err(SceneError::CapacityExceeded(capacity));
            }
        }
        Ok(self.objects.insert(object))
    }

    fn remove_object(&mut self, id: SceneObjectId) -> Option<SceneObject> {
        self.objects.remove(id)
    }

    fn set_transform(&mut self, id: SceneObjectId, transform: SceneMatrix) -> bool {
        match self.objects.get_mut(id) {
            Some(object) => {
                object.transform = transform;
                true
            }
            None => false,
        }
    }

    fn set_position(&mut self, id: SceneObjectId, position: Vector3<f32>) -> bool {
        match self.objects.get_mut(id) {
            Some(object) => {
                object.position = position;
                true
            }
            None => false,
        }
    }

    fn get(&self, id: SceneObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }
}
