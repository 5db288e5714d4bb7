//! Objects: named nodes of the archive hierarchy.

use std::fmt;
use std::sync::Arc;

use super::archive::ReaderCore;
use super::property::{ICompoundProperty, OCompoundProperty};
use super::writer::{CompoundId, ObjectId, SharedWriter};
use crate::backend::{ObjectRef, ParentRef};
use crate::core::{MetaData, ObjectHeader, PropertyHeader, SchemaMatching};
use crate::util::{Error, Result};

// ============================================================================
// OObject
// ============================================================================

/// Writer handle for an object.
#[derive(Clone)]
pub struct OObject {
    core: SharedWriter,
    id: ObjectId,
}

impl OObject {
    pub(crate) fn new(core: SharedWriter, id: ObjectId) -> Self {
        Self { core, id }
    }

    pub fn header(&self) -> ObjectHeader {
        self.core.lock().object_header(self.id).clone()
    }

    pub fn name(&self) -> String {
        self.core.lock().object_header(self.id).name.clone()
    }

    pub fn full_name(&self) -> String {
        self.core.lock().object_header(self.id).full_name.clone()
    }

    /// Create a child object with empty metadata.
    pub fn create_child(&self, name: &str) -> Result<OObject> {
        self.create_child_with(name, MetaData::new())
    }

    /// Create a child object.
    ///
    /// Fails with `DuplicateName` if a sibling already uses `name`, and
    /// with `InvalidArgument` if `name` is empty or contains `/`.
    pub fn create_child_with(&self, name: &str, meta_data: MetaData) -> Result<OObject> {
        let id = self.core.lock().create_object(self.id, name, meta_data)?;
        Ok(Self::new(Arc::clone(&self.core), id))
    }

    pub fn num_children(&self) -> usize {
        self.core.lock().object_children(self.id).len()
    }

    pub fn child_header(&self, index: usize) -> Result<ObjectHeader> {
        let core = self.core.lock();
        let children = core.object_children(self.id);
        let child = children.get(index).ok_or(Error::ChildOutOfBounds {
            index,
            count: children.len(),
        })?;
        Ok(core.object_header(*child).clone())
    }

    /// The object's top compound property.
    pub fn properties(&self) -> OCompoundProperty {
        OCompoundProperty::new(Arc::clone(&self.core), CompoundId::Object(self.id))
    }
}

impl fmt::Debug for OObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OObject").field("full_name", &self.full_name()).finish()
    }
}

// ============================================================================
// IObject
// ============================================================================

/// Reader handle for an object.
#[derive(Clone)]
pub struct IObject {
    core: Arc<ReaderCore>,
    obj: ObjectRef,
    header: ObjectHeader,
    children: Vec<(String, ObjectRef)>,
}

impl IObject {
    pub(crate) fn open(core: Arc<ReaderCore>, obj: ObjectRef) -> Result<Self> {
        let (header, children) = core.with_store(|store| {
            Ok((store.object_header(obj)?.clone(), store.list_children(obj)?))
        })?;
        Ok(Self {
            core,
            obj,
            header,
            children,
        })
    }

    pub fn header(&self) -> &ObjectHeader {
        &self.header
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn full_name(&self) -> &str {
        &self.header.full_name
    }

    pub fn meta_data(&self) -> &MetaData {
        &self.header.meta_data
    }

    pub fn is_top(&self) -> bool {
        self.obj == ObjectRef::ROOT
    }

    pub fn matches_schema(&self, title: &str) -> bool {
        self.header.matches_schema(title)
    }

    pub fn matches_schema_with(&self, title: &str, matching: SchemaMatching) -> bool {
        self.header.matches_schema_with(title, matching)
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// Names of the children in creation order.
    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(name, _)| name.as_str())
    }

    /// Child by position; an index past the end is `IndexOutOfRange`.
    pub fn child(&self, index: usize) -> Result<IObject> {
        let (_, obj) = self.children.get(index).ok_or(Error::ChildOutOfBounds {
            index,
            count: self.children.len(),
        })?;
        Self::open(Arc::clone(&self.core), *obj)
    }

    /// Child by name; a missing name is `NotFound`.
    pub fn child_by_name(&self, name: &str) -> Result<IObject> {
        let (_, obj) = self.children.iter().find(|(n, _)| n == name).ok_or_else(|| {
            let path = ObjectHeader::child_of(&self.header.full_name, name, MetaData::new()).full_name;
            Error::ObjectNotFound(path)
        })?;
        Self::open(Arc::clone(&self.core), *obj)
    }

    pub fn child_header(&self, index: usize) -> Result<ObjectHeader> {
        self.child(index).map(|c| c.header)
    }

    /// Header of a named child, `None` if there is no such child or the
    /// archive is closed.
    pub fn child_header_by_name(&self, name: &str) -> Option<ObjectHeader> {
        self.child_by_name(name).ok().map(|c| c.header)
    }

    pub fn children(&self) -> impl Iterator<Item = Result<IObject>> + '_ {
        (0..self.children.len()).map(move |i| self.child(i))
    }

    /// The object's top compound property.
    pub fn properties(&self) -> Result<ICompoundProperty> {
        let header = PropertyHeader::compound("").with_meta_data(self.header.meta_data.clone());
        ICompoundProperty::open(Arc::clone(&self.core), ParentRef::Object(self.obj), header)
    }
}

impl fmt::Debug for IObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IObject")
            .field("full_name", &self.header.full_name)
            .field("children", &self.children.len())
            .finish()
    }
}
