//! Bone hierarchy of an armature.
//!
//! Bones live in an arena indexed by [`BoneId`]. Parents are always added
//! before their children, so arena order is a valid evaluation order.

use std::collections::HashMap;

use crate::scene::BoneId;
use crate::util::{Error, Mat4, Result};

/// A bone in the arena.
#[derive(Clone, Debug, PartialEq)]
pub struct BoneNode {
    pub name: String,
    pub parent: Option<BoneId>,
    pub children: Vec<BoneId>,
    /// Rest (bind) matrix in armature space.
    pub rest: Mat4,
}

/// Arena of bones with a name lookup table.
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    bones: Vec<BoneNode>,
    by_name: HashMap<String, BoneId>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bone. The parent, if any, must already be in the arena and
    /// names must be unique.
    pub fn add_bone(&mut self, name: impl Into<String>, parent: Option<BoneId>, rest: Mat4) -> Result<BoneId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(Error::invalid(format!("duplicate bone name '{name}'")));
        }
        if let Some(parent) = parent {
            if parent.index() >= self.bones.len() {
                return Err(Error::invalid(format!("bone '{name}' has unknown parent {}", parent.0)));
            }
        }

        let id = BoneId(self.bones.len() as u32);
        if let Some(parent) = parent {
            self.bones[parent.index()].children.push(id);
        }
        self.by_name.insert(name.clone(), id);
        self.bones.push(BoneNode { name, parent, children: Vec::new(), rest });
        Ok(id)
    }

    #[inline]
    pub fn get(&self, id: BoneId) -> Option<&BoneNode> {
        self.bones.get(id.index())
    }

    #[inline]
    pub fn find(&self, name: &str) -> Option<BoneId> {
        self.by_name.get(name).copied()
    }

    pub fn parent(&self, id: BoneId) -> Option<&BoneNode> {
        self.get(id)?.parent.and_then(|p| self.get(p))
    }

    /// Bones without a parent, in arena order.
    pub fn roots(&self) -> impl Iterator<Item = BoneId> + '_ {
        self.iter().filter(|(_, b)| b.parent.is_none()).map(|(id, _)| id)
    }

    /// All bones in arena (parent-first) order.
    pub fn iter(&self) -> impl Iterator<Item = (BoneId, &BoneNode)> {
        self.bones.iter().enumerate().map(|(i, b)| (BoneId(i as u32), b))
    }

    /// Depth-first walk: each root followed by its descendants.
    pub fn depth_first(&self) -> Vec<BoneId> {
        let mut order = Vec::with_capacity(self.bones.len());
        let mut stack: Vec<BoneId> = self.roots().collect();
        stack.reverse();
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(bone) = self.get(id) {
                stack.extend(bone.children.iter().rev().copied());
            }
        }
        order
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }
}
