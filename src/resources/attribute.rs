//! Vertex attribute storage.
//!
//! Every attribute is backed by an [`AttributeData`]: a typed array, a stable
//! identity for the GPU caches, a change version and an optional dirty
//! [`UpdateRange`]. Element writers (`set_x`, `set_xyz`, ...) do **not** bump the
//! version; callers mark a finished edit with [`AttributeData::set_needs_update`]
//! or go through [`AttributeData::array_mut`], which bumps on drop.
//!
//! Element indices are unchecked beyond Rust's slice bounds check: reading or
//! writing past the end panics.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use glam::{Vec2, Vec3, Vec4};
use uuid::Uuid;

use crate::errors::{LumenError, Result};
use crate::resources::version_tracker::{ChangeTracker, MutGuard};

// ============================================================================
// Typed arrays
// ============================================================================

/// Typed numeric backing storage.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeArray {
    Float32(Vec<f32>),
    Uint16(Vec<u16>),
    Uint32(Vec<u32>),
}

impl AttributeArray {
    /// A zero-filled array of `len` elements with the same element type as `self`.
    #[must_use]
    pub fn zeroed_like(&self, len: usize) -> Self {
        match self {
            Self::Float32(_) => Self::Float32(vec![0.0; len]),
            Self::Uint16(_) => Self::Uint16(vec![0; len]),
            Self::Uint32(_) => Self::Uint32(vec![0; len]),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Float32(v) => v.len(),
            Self::Uint16(v) => v.len(),
            Self::Uint32(v) => v.len(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    #[must_use]
    pub fn bytes_per_element(&self) -> usize {
        match self {
            Self::Float32(_) | Self::Uint32(_) => 4,
            Self::Uint16(_) => 2,
        }
    }

    /// `true` for 32-bit unsigned storage, the only kind that needs
    /// `OES_element_index_uint` when used as an index.
    #[inline]
    #[must_use]
    pub fn is_u32(&self) -> bool {
        matches!(self, Self::Uint32(_))
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> f32 {
        match self {
            Self::Float32(v) => v[index],
            Self::Uint16(v) => f32::from(v[index]),
            Self::Uint32(v) => v[index] as f32,
        }
    }

    #[inline]
    #[must_use]
    pub fn get_u32(&self, index: usize) -> u32 {
        match self {
            Self::Float32(v) => v[index] as u32,
            Self::Uint16(v) => u32::from(v[index]),
            Self::Uint32(v) => v[index],
        }
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: f32) {
        match self {
            Self::Float32(v) => v[index] = value,
            Self::Uint16(v) => v[index] = value as u16,
            Self::Uint32(v) => v[index] = value as u32,
        }
    }

    /// Copies raw element `src_index` of `src` into `dst_index`, converting type if needed.
    #[inline]
    fn copy_element(&mut self, dst_index: usize, src: &AttributeArray, src_index: usize) {
        match (self, src) {
            (Self::Float32(d), Self::Float32(s)) => d[dst_index] = s[src_index],
            (Self::Uint16(d), Self::Uint16(s)) => d[dst_index] = s[src_index],
            (Self::Uint32(d), Self::Uint32(s)) => d[dst_index] = s[src_index],
            (dst, src) => dst.set(dst_index, src.get(src_index)),
        }
    }

    /// Whole array as bytes, native endian.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Float32(v) => bytemuck::cast_slice(v),
            Self::Uint16(v) => bytemuck::cast_slice(v),
            Self::Uint32(v) => bytemuck::cast_slice(v),
        }
    }

    /// Bytes of elements `start..start + count`, clamped to the array end.
    #[must_use]
    pub fn element_bytes(&self, start: usize, count: usize) -> &[u8] {
        let len = self.len();
        let start = start.min(len);
        let end = start.saturating_add(count).min(len);
        let bpe = self.bytes_per_element();
        &self.as_bytes()[start * bpe..end * bpe]
    }

    /// Gathers the elements at `indices` (item-wise) into a new array.
    fn gather(&self, indices: impl Iterator<Item = usize>, item_size: usize) -> Self {
        let mut out = self.zeroed_like(0);
        for index in indices {
            for c in 0..item_size {
                let i = index * item_size + c;
                match (&mut out, self) {
                    (Self::Float32(d), Self::Float32(s)) => d.push(s[i]),
                    (Self::Uint16(d), Self::Uint16(s)) => d.push(s[i]),
                    (Self::Uint32(d), Self::Uint32(s)) => d.push(s[i]),
                    _ => unreachable!("zeroed_like keeps the element type"),
                }
            }
        }
        out
    }
}

// ============================================================================
// Shared data core
// ============================================================================

/// The sub-range (in elements) modified since the last upload.
///
/// `count == None` means the whole buffer. After a partial upload the count is
/// reset to `Some(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateRange {
    pub offset: usize,
    pub count: Option<usize>,
}

/// Typed array plus identity and GPU-sync bookkeeping.
#[derive(Debug)]
pub struct AttributeData {
    id: Uuid,
    array: AttributeArray,
    dynamic: bool,
    pub update_range: UpdateRange,
    tracker: ChangeTracker,
}

impl AttributeData {
    #[must_use]
    pub fn new(array: AttributeArray) -> Self {
        Self {
            id: Uuid::new_v4(),
            array,
            dynamic: false,
            update_range: UpdateRange::default(),
            tracker: ChangeTracker::new(),
        }
    }

    /// Identity used to key GPU buffer caches.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn array(&self) -> &AttributeArray {
        &self.array
    }

    /// Mutable access; the version is bumped when the guard drops.
    pub fn array_mut(&mut self) -> MutGuard<'_, AttributeArray> {
        MutGuard::new(&mut self.array, &mut self.tracker)
    }

    /// Replaces the contents and bumps the version.
    pub fn set_array(&mut self, array: AttributeArray) {
        self.array = array;
        self.tracker.changed();
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.tracker.version()
    }

    /// Whether the contents changed after a sync at version `synced`.
    #[inline]
    #[must_use]
    pub fn changed_since(&self, synced: u64) -> bool {
        self.tracker.is_newer_than(synced)
    }

    /// `true` marks the contents as changed; `false` is a no-op.
    pub fn set_needs_update(&mut self, value: bool) {
        self.tracker.set_needs_update(value);
    }

    #[inline]
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn set_dynamic(&mut self, dynamic: bool) {
        self.dynamic = dynamic;
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.array.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }
}

impl Clone for AttributeData {
    /// Deep copy with a fresh identity, so the copy never aliases the
    /// original's GPU buffer.
    fn clone(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            array: self.array.clone(),
            dynamic: self.dynamic,
            update_range: self.update_range,
            tracker: ChangeTracker::new(),
        }
    }
}

// ============================================================================
// BufferAttribute
// ============================================================================

/// A planar attribute: `item_size` consecutive components per element.
#[derive(Debug, Clone)]
pub struct BufferAttribute {
    data: AttributeData,
    item_size: usize,
    pub normalized: bool,
}

impl BufferAttribute {
    /// # Panics
    /// If `item_size` is zero or the array length is not a multiple of it.
    #[must_use]
    pub fn new(array: AttributeArray, item_size: usize) -> Self {
        assert!(item_size > 0, "item_size must be positive");
        assert_eq!(
            array.len() % item_size,
            0,
            "array length {} is not a multiple of item_size {item_size}",
            array.len()
        );
        Self {
            data: AttributeData::new(array),
            item_size,
            normalized: false,
        }
    }

    #[must_use]
    pub fn from_f32(values: Vec<f32>, item_size: usize) -> Self {
        Self::new(AttributeArray::Float32(values), item_size)
    }

    #[must_use]
    pub fn from_u32(values: Vec<u32>, item_size: usize) -> Self {
        Self::new(AttributeArray::Uint32(values), item_size)
    }

    #[must_use]
    pub fn from_u16(values: Vec<u16>, item_size: usize) -> Self {
        Self::new(AttributeArray::Uint16(values), item_size)
    }

    /// A zero-filled float attribute holding `count` elements.
    #[must_use]
    pub fn zeroed_f32(count: usize, item_size: usize) -> Self {
        Self::from_f32(vec![0.0; count * item_size], item_size)
    }

    #[must_use]
    pub fn with_dynamic(mut self, dynamic: bool) -> Self {
        self.data.set_dynamic(dynamic);
        self
    }

    #[must_use]
    pub fn with_normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }

    #[inline]
    #[must_use]
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Number of logical elements, `len / item_size`.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.data.len() / self.item_size
    }

    #[inline]
    #[must_use]
    pub fn data(&self) -> &AttributeData {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut AttributeData {
        &mut self.data
    }

    #[inline]
    #[must_use]
    pub fn array(&self) -> &AttributeArray {
        self.data.array()
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.data.version()
    }

    pub fn set_needs_update(&mut self, value: bool) {
        self.data.set_needs_update(value);
    }

    #[inline]
    #[must_use]
    pub fn get_component(&self, index: usize, component: usize) -> f32 {
        self.data.array.get(index * self.item_size + component)
    }

    #[inline]
    pub fn set_component(&mut self, index: usize, component: usize, value: f32) {
        self.data.array.set(index * self.item_size + component, value);
    }

    #[must_use]
    pub fn get_x(&self, index: usize) -> f32 {
        self.get_component(index, 0)
    }

    #[must_use]
    pub fn get_y(&self, index: usize) -> f32 {
        self.get_component(index, 1)
    }

    #[must_use]
    pub fn get_z(&self, index: usize) -> f32 {
        self.get_component(index, 2)
    }

    #[must_use]
    pub fn get_w(&self, index: usize) -> f32 {
        self.get_component(index, 3)
    }

    pub fn set_x(&mut self, index: usize, x: f32) -> &mut Self {
        self.set_component(index, 0, x);
        self
    }

    pub fn set_y(&mut self, index: usize, y: f32) -> &mut Self {
        self.set_component(index, 1, y);
        self
    }

    pub fn set_z(&mut self, index: usize, z: f32) -> &mut Self {
        self.set_component(index, 2, z);
        self
    }

    pub fn set_w(&mut self, index: usize, w: f32) -> &mut Self {
        self.set_component(index, 3, w);
        self
    }

    pub fn set_xy(&mut self, index: usize, x: f32, y: f32) -> &mut Self {
        self.set_component(index, 0, x);
        self.set_component(index, 1, y);
        self
    }

    pub fn set_xyz(&mut self, index: usize, x: f32, y: f32, z: f32) -> &mut Self {
        self.set_component(index, 0, x);
        self.set_component(index, 1, y);
        self.set_component(index, 2, z);
        self
    }

    pub fn set_xyzw(&mut self, index: usize, x: f32, y: f32, z: f32, w: f32) -> &mut Self {
        self.set_component(index, 0, x);
        self.set_component(index, 1, y);
        self.set_component(index, 2, z);
        self.set_component(index, 3, w);
        self
    }

    #[must_use]
    pub fn get_vec3(&self, index: usize) -> Vec3 {
        Vec3::new(self.get_x(index), self.get_y(index), self.get_z(index))
    }

    /// Copies element `src_index` of `other` into element `index` of `self`.
    pub fn copy_at(&mut self, index: usize, other: &BufferAttribute, src_index: usize) -> Result<()> {
        if other.item_size != self.item_size {
            return Err(LumenError::AttributeMismatch {
                expected: self.item_size,
                found: other.item_size,
            });
        }
        let dst = index * self.item_size;
        let src = src_index * other.item_size;
        for c in 0..self.item_size {
            self.data.array.copy_element(dst + c, other.array(), src + c);
        }
        Ok(())
    }

    // --- Bulk writers ---------------------------------------------------------
    // Each writes from element 0 and silently stops at the end of the array.

    pub fn copy_array(&mut self, values: &[f32]) -> &mut Self {
        let len = self.data.len().min(values.len());
        for (i, &v) in values.iter().take(len).enumerate() {
            self.data.array.set(i, v);
        }
        self
    }

    pub fn copy_colors_array(&mut self, colors: &[Vec3]) -> &mut Self {
        self.copy_vector3s_array(colors)
    }

    pub fn copy_indices_array(&mut self, faces: &[[u32; 3]]) -> &mut Self {
        let limit = self.data.len();
        for (i, face) in faces.iter().enumerate() {
            for (c, &v) in face.iter().enumerate() {
                let at = i * 3 + c;
                if at >= limit {
                    return self;
                }
                match &mut self.data.array {
                    AttributeArray::Uint32(d) => d[at] = v,
                    other => other.set(at, v as f32),
                }
            }
        }
        self
    }

    pub fn copy_vector2s_array(&mut self, vectors: &[Vec2]) -> &mut Self {
        let flat: Vec<f32> = vectors.iter().flat_map(|v| v.to_array()).collect();
        self.copy_array(&flat)
    }

    pub fn copy_vector3s_array(&mut self, vectors: &[Vec3]) -> &mut Self {
        let flat: Vec<f32> = vectors.iter().flat_map(|v| v.to_array()).collect();
        self.copy_array(&flat)
    }

    pub fn copy_vector4s_array(&mut self, vectors: &[Vec4]) -> &mut Self {
        let flat: Vec<f32> = vectors.iter().flat_map(|v| v.to_array()).collect();
        self.copy_array(&flat)
    }

    /// Structural copy of `source` into `self`: array, item size and flags.
    /// The identity of `self` is kept; its version is bumped.
    pub fn copy_from(&mut self, source: &BufferAttribute) -> &mut Self {
        self.item_size = source.item_size;
        self.normalized = source.normalized;
        self.data.dynamic = source.data.dynamic;
        self.data.update_range = source.data.update_range;
        self.data.set_array(source.array().clone());
        self
    }

    /// A new attribute holding the elements at `indices`, in order.
    #[must_use]
    pub fn gather(&self, indices: &[usize]) -> Self {
        let array = self.data.array.gather(indices.iter().copied(), self.item_size);
        let mut out = Self::new(array, self.item_size);
        out.normalized = self.normalized;
        out
    }
}

// ============================================================================
// InstancedBufferAttribute
// ============================================================================

/// A per-instance attribute advancing once every `mesh_per_attribute` instances.
#[derive(Debug, Clone)]
pub struct InstancedBufferAttribute {
    pub attribute: BufferAttribute,
    pub mesh_per_attribute: u32,
}

impl InstancedBufferAttribute {
    #[must_use]
    pub fn new(attribute: BufferAttribute, mesh_per_attribute: u32) -> Self {
        Self {
            attribute,
            mesh_per_attribute,
        }
    }
}

// ============================================================================
// Interleaved
// ============================================================================

/// One array shared by several attributes; `stride` components per vertex.
#[derive(Debug, Clone)]
pub struct InterleavedBuffer {
    data: AttributeData,
    stride: usize,
    /// Instancing divisor, `0` for per-vertex data.
    pub mesh_per_attribute: u32,
}

pub type SharedInterleavedBuffer = Rc<RefCell<InterleavedBuffer>>;

impl InterleavedBuffer {
    /// # Panics
    /// If `stride` is zero or the array length is not a multiple of it.
    #[must_use]
    pub fn new(array: AttributeArray, stride: usize) -> Self {
        assert!(stride > 0, "stride must be positive");
        assert_eq!(array.len() % stride, 0, "array length is not a multiple of stride");
        Self {
            data: AttributeData::new(array),
            stride,
            mesh_per_attribute: 0,
        }
    }

    #[must_use]
    pub fn shared(self) -> SharedInterleavedBuffer {
        Rc::new(RefCell::new(self))
    }

    #[inline]
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.data.len() / self.stride
    }

    #[inline]
    #[must_use]
    pub fn data(&self) -> &AttributeData {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut AttributeData {
        &mut self.data
    }
}

/// A view into an [`InterleavedBuffer`] at component `offset` within each stride.
#[derive(Debug, Clone)]
pub struct InterleavedBufferAttribute {
    buffer: SharedInterleavedBuffer,
    item_size: usize,
    offset: usize,
    pub normalized: bool,
}

impl InterleavedBufferAttribute {
    #[must_use]
    pub fn new(buffer: SharedInterleavedBuffer, item_size: usize, offset: usize) -> Self {
        Self {
            buffer,
            item_size,
            offset,
            normalized: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn buffer(&self) -> &SharedInterleavedBuffer {
        &self.buffer
    }

    #[inline]
    #[must_use]
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.buffer.borrow().count()
    }

    #[inline]
    fn element_index(&self, stride: usize, index: usize, component: usize) -> usize {
        index * stride + self.offset + component
    }

    #[must_use]
    pub fn get_component(&self, index: usize, component: usize) -> f32 {
        let buffer = self.buffer.borrow();
        let i = self.element_index(buffer.stride, index, component);
        buffer.data.array.get(i)
    }

    pub fn set_component(&mut self, index: usize, component: usize, value: f32) {
        let mut buffer = self.buffer.borrow_mut();
        let i = self.element_index(buffer.stride, index, component);
        buffer.data.array.set(i, value);
    }

    #[must_use]
    pub fn get_x(&self, index: usize) -> f32 {
        self.get_component(index, 0)
    }

    #[must_use]
    pub fn get_y(&self, index: usize) -> f32 {
        self.get_component(index, 1)
    }

    #[must_use]
    pub fn get_z(&self, index: usize) -> f32 {
        self.get_component(index, 2)
    }

    #[must_use]
    pub fn get_w(&self, index: usize) -> f32 {
        self.get_component(index, 3)
    }

    pub fn set_x(&mut self, index: usize, x: f32) -> &mut Self {
        self.set_component(index, 0, x);
        self
    }

    pub fn set_y(&mut self, index: usize, y: f32) -> &mut Self {
        self.set_component(index, 1, y);
        self
    }

    pub fn set_z(&mut self, index: usize, z: f32) -> &mut Self {
        self.set_component(index, 2, z);
        self
    }

    pub fn set_w(&mut self, index: usize, w: f32) -> &mut Self {
        self.set_component(index, 3, w);
        self
    }

    pub fn set_xyz(&mut self, index: usize, x: f32, y: f32, z: f32) -> &mut Self {
        self.set_component(index, 0, x);
        self.set_component(index, 1, y);
        self.set_component(index, 2, z);
        self
    }
}

// ============================================================================
// Attribute
// ============================================================================

/// Any vertex attribute a geometry can hold.
#[derive(Debug, Clone)]
pub enum Attribute {
    Buffer(BufferAttribute),
    Instanced(InstancedBufferAttribute),
    Interleaved(InterleavedBufferAttribute),
}

/// Borrowed data core of an [`Attribute`].
pub enum DataRef<'a> {
    Direct(&'a AttributeData),
    Shared(Ref<'a, InterleavedBuffer>),
}

impl std::ops::Deref for DataRef<'_> {
    type Target = AttributeData;

    fn deref(&self) -> &AttributeData {
        match self {
            Self::Direct(data) => data,
            Self::Shared(buffer) => &buffer.data,
        }
    }
}

/// Mutably borrowed data core of an [`Attribute`].
pub enum DataMut<'a> {
    Direct(&'a mut AttributeData),
    Shared(RefMut<'a, InterleavedBuffer>),
}

impl std::ops::Deref for DataMut<'_> {
    type Target = AttributeData;

    fn deref(&self) -> &AttributeData {
        match self {
            Self::Direct(data) => data,
            Self::Shared(buffer) => &buffer.data,
        }
    }
}

impl std::ops::DerefMut for DataMut<'_> {
    fn deref_mut(&mut self) -> &mut AttributeData {
        match self {
            Self::Direct(data) => data,
            Self::Shared(buffer) => &mut buffer.data,
        }
    }
}

impl Attribute {
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Buffer(a) => a.count(),
            Self::Instanced(a) => a.attribute.count(),
            Self::Interleaved(a) => a.count(),
        }
    }

    #[must_use]
    pub fn item_size(&self) -> usize {
        match self {
            Self::Buffer(a) => a.item_size(),
            Self::Instanced(a) => a.attribute.item_size(),
            Self::Interleaved(a) => a.item_size(),
        }
    }

    #[must_use]
    pub fn normalized(&self) -> bool {
        match self {
            Self::Buffer(a) => a.normalized,
            Self::Instanced(a) => a.attribute.normalized,
            Self::Interleaved(a) => a.normalized,
        }
    }

    /// Instancing divisor, `0` for per-vertex data.
    #[must_use]
    pub fn divisor(&self) -> u32 {
        match self {
            Self::Buffer(_) => 0,
            Self::Instanced(a) => a.mesh_per_attribute,
            Self::Interleaved(a) => a.buffer.borrow().mesh_per_attribute,
        }
    }

    /// `(stride, offset)` in bytes for `vertexAttribPointer`.
    #[must_use]
    pub fn byte_layout(&self) -> (usize, usize) {
        match self {
            Self::Buffer(_) | Self::Instanced(_) => (0, 0),
            Self::Interleaved(a) => {
                let buffer = a.buffer.borrow();
                let bpe = buffer.data.array.bytes_per_element();
                (buffer.stride * bpe, a.offset * bpe)
            }
        }
    }

    #[must_use]
    pub fn data(&self) -> DataRef<'_> {
        match self {
            Self::Buffer(a) => DataRef::Direct(a.data()),
            Self::Instanced(a) => DataRef::Direct(a.attribute.data()),
            Self::Interleaved(a) => DataRef::Shared(a.buffer.borrow()),
        }
    }

    pub fn data_mut(&mut self) -> DataMut<'_> {
        match self {
            Self::Buffer(a) => DataMut::Direct(a.data_mut()),
            Self::Instanced(a) => DataMut::Direct(a.attribute.data_mut()),
            Self::Interleaved(a) => DataMut::Shared(a.buffer.borrow_mut()),
        }
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.data().version()
    }

    pub fn set_needs_update(&mut self, value: bool) {
        self.data_mut().set_needs_update(value);
    }

    #[must_use]
    pub fn get_component(&self, index: usize, component: usize) -> f32 {
        match self {
            Self::Buffer(a) => a.get_component(index, component),
            Self::Instanced(a) => a.attribute.get_component(index, component),
            Self::Interleaved(a) => a.get_component(index, component),
        }
    }

    pub fn set_component(&mut self, index: usize, component: usize, value: f32) {
        match self {
            Self::Buffer(a) => a.set_component(index, component, value),
            Self::Instanced(a) => a.attribute.set_component(index, component, value),
            Self::Interleaved(a) => a.set_component(index, component, value),
        }
    }

    #[must_use]
    pub fn get_vec3(&self, index: usize) -> Vec3 {
        Vec3::new(
            self.get_component(index, 0),
            self.get_component(index, 1),
            self.get_component(index, 2),
        )
    }

    pub fn set_vec3(&mut self, index: usize, v: Vec3) {
        self.set_component(index, 0, v.x);
        self.set_component(index, 1, v.y);
        self.set_component(index, 2, v.z);
    }

    #[must_use]
    pub fn as_buffer(&self) -> Option<&BufferAttribute> {
        match self {
            Self::Buffer(a) => Some(a),
            Self::Instanced(a) => Some(&a.attribute),
            Self::Interleaved(_) => None,
        }
    }

    /// A planar copy holding the elements at `indices`, in order.
    #[must_use]
    pub fn gather(&self, indices: &[usize]) -> BufferAttribute {
        match self {
            Self::Buffer(a) => a.gather(indices),
            Self::Instanced(a) => a.attribute.gather(indices),
            Self::Interleaved(a) => {
                let item_size = a.item_size();
                let mut values = Vec::with_capacity(indices.len() * item_size);
                for &index in indices {
                    for c in 0..item_size {
                        values.push(a.get_component(index, c));
                    }
                }
                BufferAttribute::from_f32(values, item_size).with_normalized(a.normalized)
            }
        }
    }
}

impl From<BufferAttribute> for Attribute {
    fn from(attribute: BufferAttribute) -> Self {
        Self::Buffer(attribute)
    }
}

impl From<InstancedBufferAttribute> for Attribute {
    fn from(attribute: InstancedBufferAttribute) -> Self {
        Self::Instanced(attribute)
    }
}

impl From<InterleavedBufferAttribute> for Attribute {
    fn from(attribute: InterleavedBufferAttribute) -> Self {
        Self::Interleaved(attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_xyz_then_read_components() {
        let mut attr = BufferAttribute::zeroed_f32(4, 3);
        attr.set_xyz(2, 1.0, 2.0, 3.0);
        assert_eq!(attr.get_x(2), 1.0);
        assert_eq!(attr.get_y(2), 2.0);
        assert_eq!(attr.get_z(2), 3.0);
        assert_eq!(attr.count(), 4);
    }

    #[test]
    fn set_w_writes_fourth_component() {
        let mut attr = BufferAttribute::zeroed_f32(1, 4);
        attr.set_w(0, 9.0);
        assert_eq!(attr.get_w(0), 9.0);
        assert_eq!(attr.get_z(0), 0.0);
    }

    #[test]
    fn element_writes_do_not_bump_version() {
        let mut attr = BufferAttribute::zeroed_f32(2, 2);
        let v0 = attr.version();
        attr.set_xy(0, 1.0, 1.0);
        assert_eq!(attr.version(), v0);
        attr.set_needs_update(true);
        assert_eq!(attr.version(), v0 + 1);
        attr.set_needs_update(false);
        assert_eq!(attr.version(), v0 + 1);
    }

    #[test]
    fn array_mut_guard_bumps_version() {
        let mut attr = BufferAttribute::zeroed_f32(2, 1);
        {
            let mut array = attr.data_mut().array_mut();
            array.set(1, 5.0);
        }
        assert_eq!(attr.version(), 1);
        assert_eq!(attr.get_x(1), 5.0);
    }

    #[test]
    fn copy_at_requires_matching_item_size() {
        let mut a = BufferAttribute::zeroed_f32(2, 3);
        let b = BufferAttribute::from_f32(vec![1.0, 2.0, 3.0], 3);
        let c = BufferAttribute::from_f32(vec![1.0, 2.0], 2);

        a.copy_at(1, &b, 0).unwrap();
        assert_eq!(a.get_vec3(1), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(
            a.copy_at(0, &c, 0),
            Err(LumenError::AttributeMismatch { expected: 3, found: 2 })
        );
    }

    #[test]
    fn clone_is_deep_with_new_identity() {
        let a = BufferAttribute::from_f32(vec![1.0, 2.0], 1);
        let mut b = a.clone();
        b.set_x(0, 7.0);
        assert_eq!(a.get_x(0), 1.0);
        assert_ne!(a.data().id(), b.data().id());
    }

    #[test]
    fn copy_from_is_structural() {
        let source = BufferAttribute::from_f32(vec![1.0, 2.0, 3.0, 4.0], 2).with_normalized(true);
        let mut target = BufferAttribute::zeroed_f32(1, 4);
        let id = target.data().id();
        target.copy_from(&source);
        assert_eq!(target.item_size(), 2);
        assert_eq!(target.count(), 2);
        assert!(target.normalized);
        assert_eq!(target.data().id(), id);
    }

    #[test]
    fn bulk_writers_stop_at_array_end() {
        let mut attr = BufferAttribute::zeroed_f32(1, 3);
        attr.copy_vector3s_array(&[Vec3::ONE, Vec3::splat(2.0)]);
        assert_eq!(attr.get_vec3(0), Vec3::ONE);

        let mut index = BufferAttribute::from_u32(vec![0; 6], 1);
        index.copy_indices_array(&[[0, 1, 2], [2, 3, 0]]);
        assert_eq!(index.array(), &AttributeArray::Uint32(vec![0, 1, 2, 2, 3, 0]));
    }

    #[test]
    fn interleaved_addressing_uses_stride_and_offset() {
        // position (3) + uv (2) per vertex
        let buffer = InterleavedBuffer::new(AttributeArray::Float32(vec![0.0; 10]), 5).shared();
        let mut position = InterleavedBufferAttribute::new(buffer.clone(), 3, 0);
        let mut uv = InterleavedBufferAttribute::new(buffer.clone(), 2, 3);

        position.set_xyz(1, 1.0, 2.0, 3.0);
        uv.set_x(1, 0.5).set_y(1, 0.25);

        assert_eq!(position.count(), 2);
        let data = buffer.borrow();
        assert_eq!(
            data.data().array(),
            &AttributeArray::Float32(vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 0.5, 0.25])
        );
    }

    #[test]
    fn interleaved_byte_layout() {
        let buffer = InterleavedBuffer::new(AttributeArray::Float32(vec![0.0; 10]), 5).shared();
        let uv = Attribute::from(InterleavedBufferAttribute::new(buffer, 2, 3));
        assert_eq!(uv.byte_layout(), (20, 12));
    }

    #[test]
    fn element_bytes_clamps() {
        let array = AttributeArray::Uint16(vec![1, 2, 3]);
        assert_eq!(array.element_bytes(1, 10).len(), 4);
        assert_eq!(array.element_bytes(5, 1).len(), 0);
    }
}
