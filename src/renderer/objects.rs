//! GPU buffer synchronisation for geometry attributes.
//!
//! [`GlObjects`] owns one [`GpuBuffer`] per attribute data core, keyed by the
//! data's identity. Uploads are version driven: an unchanged version never
//! touches the context, a changed one re-uploads the whole store or only the
//! recorded [`UpdateRange`](crate::resources::UpdateRange) of a dynamic buffer.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use uuid::Uuid;

use super::buffer::GpuBuffer;
use super::geometries::GlGeometries;
use super::gl::{BufferId, GlContext, constants as gl};
use super::properties::GlProperties;
use crate::errors::{LumenError, Result};
use crate::resources::{AttributeArray, AttributeData, BufferAttribute, BufferGeometry, MAX_INDEX};
use crate::scene::{ObjectGeometry, RenderObject};

/// Cached GPU side of one attribute data core.
#[derive(Debug)]
pub struct AttributeBuffer {
    pub buffer: GpuBuffer,
    /// Data version last uploaded.
    pub version: u64,
    /// GL component type of the uploaded store.
    pub data_type: u32,
    pub bytes_per_element: usize,
}

/// Line-list index of a flat geometry and the data it was built from.
struct Wireframe {
    attribute: BufferAttribute,
    /// Id and version of the index, or of `position` when non-indexed.
    source: (Uuid, u64),
}

type DataIds = SmallVec<[Uuid; 8]>;

pub struct GlObjects {
    gl: GlContext,
    element_index_uint: bool,
    geometries: GlGeometries,
    buffers: GlProperties<AttributeBuffer>,
    /// Data ids each flat geometry drew from at its last update.
    uploaded: FxHashMap<Uuid, DataIds>,
    wireframes: GlProperties<Wireframe>,
}

impl GlObjects {
    #[must_use]
    pub fn new(gl: GlContext, element_index_uint: bool) -> Self {
        Self {
            gl,
            element_index_uint,
            geometries: GlGeometries::new(),
            buffers: GlProperties::new(),
            uploaded: FxHashMap::default(),
            wireframes: GlProperties::new(),
        }
    }

    #[must_use]
    pub fn geometries(&self) -> &GlGeometries {
        &self.geometries
    }

    /// Resolves the object's flat geometry and brings every buffer it draws
    /// from up to date.
    ///
    /// Buffers of data the geometry no longer references (a replaced
    /// attribute, a re-flattened legacy geometry) are released unless another
    /// geometry still draws from them.
    pub fn update(&mut self, object: &RenderObject) -> Result<Rc<RefCell<BufferGeometry>>> {
        let geometry = self.geometries.get(object)?;

        if let ObjectGeometry::Legacy(legacy) = &object.geometry {
            geometry
                .borrow_mut()
                .update_from_object(&object.kind, &mut legacy.borrow_mut())?;
        }

        {
            let mut flat = geometry.borrow_mut();
            if let Some(index) = flat.index_mut() {
                self.update_attribute(index.data_mut(), gl::ELEMENT_ARRAY_BUFFER)?;
            }
            for (_, attribute) in flat.attributes_mut() {
                self.update_attribute(&mut attribute.data_mut(), gl::ARRAY_BUFFER)?;
            }
            for target in flat.morph_attributes_mut() {
                self.update_attribute(target.data_mut(), gl::ARRAY_BUFFER)?;
            }
        }

        let (uuid, live) = {
            let flat = geometry.borrow();
            (flat.uuid(), data_ids(&flat))
        };
        if let Some(previous) = self.uploaded.insert(uuid, live) {
            let current = &self.uploaded[&uuid];
            let stale: DataIds = previous.into_iter().filter(|id| !current.contains(id)).collect();
            self.release(&stale);
        }

        Ok(geometry)
    }

    /// Frees the buffers of `ids` that no tracked geometry references.
    fn release(&mut self, ids: &[Uuid]) {
        for id in ids {
            let referenced = self.uploaded.values().any(|owned| owned.contains(id));
            if !referenced && self.buffers.remove(id).is_some() {
                log::debug!("Released attribute buffer {id}");
            }
        }
    }

    /// Creates or refreshes the GPU buffer of `data`.
    ///
    /// The version is recorded in every case, including the skipped upload of
    /// a dynamic buffer whose update range is empty.
    pub fn update_attribute(&mut self, data: &mut AttributeData, target: u32) -> Result<()> {
        let narrow = target == gl::ELEMENT_ARRAY_BUFFER
            && data.array().is_u32()
            && !self.element_index_uint;

        let Some(cached) = self.buffers.get_mut(&data.id()) else {
            let entry = self.create_buffer(data, target, narrow)?;
            self.buffers.get_or_insert_with(data.id(), || entry);
            return Ok(());
        };

        if !data.changed_since(cached.version) {
            return Ok(());
        }

        let range = data.update_range;
        if !data.is_dynamic() || range.count.is_none() {
            cached.buffer.upload(&upload_bytes(data.array(), narrow));
        } else if let Some(count) = range.count.filter(|&count| count > 0) {
            let array = data.array();
            let bytes = if narrow {
                let end = range.offset.saturating_add(count).min(array.len());
                Cow::Owned(narrow_indices(array, range.offset.min(end)..end))
            } else {
                Cow::Borrowed(array.element_bytes(range.offset, count))
            };
            cached
                .buffer
                .upload_range(range.offset * cached.bytes_per_element, &bytes);
            data.update_range.count = Some(0);
        } else {
            log::error!(
                "Dynamic attribute {} marked as needing an update but its update range count is 0; \
                 set the range before marking it",
                data.id()
            );
        }

        cached.version = data.version();
        Ok(())
    }

    fn create_buffer(&self, data: &AttributeData, target: u32, narrow: bool) -> Result<AttributeBuffer> {
        let usage = if data.is_dynamic() {
            gl::DYNAMIC_DRAW
        } else {
            gl::STATIC_DRAW
        };
        let (data_type, bytes_per_element) = if narrow {
            (gl::UNSIGNED_SHORT, 2)
        } else {
            match data.array() {
                AttributeArray::Float32(_) => (gl::FLOAT, 4),
                AttributeArray::Uint16(_) => (gl::UNSIGNED_SHORT, 2),
                AttributeArray::Uint32(_) => (gl::UNSIGNED_INT, 4),
            }
        };
        if narrow && (0..data.len()).any(|i| data.array().get_u32(i) > MAX_INDEX) {
            log::warn!(
                "OES_element_index_uint unavailable: indices above {MAX_INDEX} in {} are truncated to 16 bits",
                data.id()
            );
        }
        let buffer = GpuBuffer::new(&self.gl, target, &upload_bytes(data.array(), narrow), usage)?;
        Ok(AttributeBuffer {
            buffer,
            version: data.version(),
            data_type,
            bytes_per_element,
        })
    }

    /// The buffer cached for the data core `data_id`.
    #[must_use]
    pub fn attribute_buffer(&self, data_id: &Uuid) -> Option<&AttributeBuffer> {
        self.buffers.get(data_id)
    }

    #[must_use]
    pub fn buffer_id(&self, data_id: &Uuid) -> Option<BufferId> {
        self.buffers.get(data_id).map(|entry| entry.buffer.id())
    }

    /// Line-list index listing every triangle edge once, uploaded to an
    /// element buffer. Rebuilt when the index (or `position` of a
    /// non-indexed geometry) is replaced or its version moves.
    pub fn wireframe_attribute(&mut self, geometry: &BufferGeometry) -> Result<&BufferAttribute> {
        let uuid = geometry.uuid();
        let source = wireframe_source(geometry);
        let stale = self
            .wireframes
            .get(&uuid)
            .filter(|cached| cached.source != source)
            .map(|cached| cached.attribute.data().id());
        if let Some(id) = stale {
            self.wireframes.remove(&uuid);
            self.buffers.remove(&id);
        }
        if !self.wireframes.contains(&uuid) {
            let mut attribute = wireframe_index(geometry);
            self.update_attribute(attribute.data_mut(), gl::ELEMENT_ARRAY_BUFFER)?;
            self.wireframes.get_or_insert_with(uuid, || Wireframe { attribute, source });
        }
        self.wireframes
            .get(&uuid)
            .map(|cached| &cached.attribute)
            .ok_or_else(|| LumenError::InvalidGeometry(format!("no wireframe index for {uuid}")))
    }

    /// Releases the GPU buffers of the geometry registered under `uuid`,
    /// keeping data another geometry still draws from.
    pub fn dispose_geometry(&mut self, uuid: &Uuid) {
        let flat_uuid = self
            .geometries
            .remove(uuid)
            .map_or(*uuid, |geometry| geometry.borrow().uuid());
        if let Some(wireframe) = self.wireframes.remove(&flat_uuid) {
            self.buffers.remove(&wireframe.attribute.data().id());
        }
        let Some(owned) = self.uploaded.remove(&flat_uuid) else {
            return;
        };
        self.release(&owned);
        log::debug!("Disposed geometry {uuid}");
    }

    /// Number of live attribute buffers.
    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Drops every cached buffer and derived geometry.
    pub fn clear(&mut self) {
        self.wireframes.clear();
        self.uploaded.clear();
        self.buffers.clear();
        self.geometries.clear();
    }
}

/// Every data core `geometry` draws from, once each.
fn data_ids(geometry: &BufferGeometry) -> DataIds {
    let mut ids = DataIds::new();
    let mut push = |id: Uuid| {
        if !ids.contains(&id) {
            ids.push(id);
        }
    };
    if let Some(index) = geometry.index() {
        push(index.data().id());
    }
    for (_, attribute) in geometry.attributes() {
        push(attribute.data().id());
    }
    for (_, target) in geometry.morph_attribute_sets() {
        for attribute in target {
            push(attribute.data().id());
        }
    }
    ids
}

fn wireframe_source(geometry: &BufferGeometry) -> (Uuid, u64) {
    if let Some(index) = geometry.index() {
        (index.data().id(), index.version())
    } else if let Some(position) = geometry.attribute("position") {
        (position.data().id(), position.version())
    } else {
        (Uuid::nil(), 0)
    }
}

fn upload_bytes(array: &AttributeArray, narrow: bool) -> Cow<'_, [u8]> {
    if narrow {
        Cow::Owned(narrow_indices(array, 0..array.len()))
    } else {
        Cow::Borrowed(array.as_bytes())
    }
}

/// 32-bit indices as 16-bit bytes; values above 65535 wrap.
fn narrow_indices(array: &AttributeArray, range: std::ops::Range<usize>) -> Vec<u8> {
    let narrowed: Vec<u16> = range.map(|i| array.get_u32(i) as u16).collect();
    bytemuck::cast_slice(&narrowed).to_vec()
}

/// Records `a-b` unless already present; edges are keyed by the lower vertex.
fn insert_edge(edges: &mut FxHashMap<u32, SmallVec<[u32; 4]>>, a: u32, b: u32) -> bool {
    let (low, high) = if a > b { (b, a) } else { (a, b) };
    let adjacent = edges.entry(low).or_default();
    if adjacent.contains(&high) {
        false
    } else {
        adjacent.push(high);
        true
    }
}

fn wireframe_index(geometry: &BufferGeometry) -> BufferAttribute {
    let mut indices: Vec<u32> = Vec::new();

    if let Some(index) = geometry.index() {
        let array = index.array();
        let mut edges: FxHashMap<u32, SmallVec<[u32; 4]>> = FxHashMap::default();
        for triangle in 0..array.len() / 3 {
            let a = array.get_u32(triangle * 3);
            let b = array.get_u32(triangle * 3 + 1);
            let c = array.get_u32(triangle * 3 + 2);
            for (from, to) in [(a, b), (b, c), (c, a)] {
                if insert_edge(&mut edges, from, to) {
                    indices.extend([from, to]);
                }
            }
        }
    } else if let Some(position) = geometry.attribute("position") {
        let vertices = position.count() as u32;
        let mut a = 0;
        while a + 2 < vertices {
            let (b, c) = (a + 1, a + 2);
            indices.extend([a, b, b, c, c, a]);
            a += 3;
        }
    }

    if indices.iter().any(|&i| i > MAX_INDEX) {
        BufferAttribute::from_u32(indices, 1)
    } else {
        BufferAttribute::from_u16(indices.into_iter().map(|i| i as u16).collect(), 1)
    }
}
