#![forbid(unsafe_code)]

use std::borrow::Cow;
use std::path::Path;

use crate::asset::item::{load, Asset, Lifecycle};
use crate::pak::{fit_name, Pak, PakError, PakResult};

/// Name-indexed cache of loaded assets, sourced from a pak when one is attached and from
/// the filesystem otherwise.
///
/// The slot table has a fixed capacity. Ids are unique for the lifetime of the map.
pub struct AssetMap<'a> {
    slots: Vec<Option<Asset<'a>>>,
    last_id: u32,
    pack: Option<Pak<'a>>,
}

impl AssetMap<'static> {
    /// Map backed by the pak file at `path`.
    pub fn open_pack(path: impl AsRef<Path>, capacity: usize) -> PakResult<AssetMap<'static>> {
        Ok(AssetMap::with_pack(Pak::open_file(path)?, capacity))
    }
}

impl<'a> AssetMap<'a> {
    /// Filesystem-backed map.
    pub fn new(capacity: usize) -> Self {
        AssetMap {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
            last_id: 0,
            pack: None,
        }
    }

    pub fn with_pack(pack: Pak<'a>, capacity: usize) -> Self {
        AssetMap {
            pack: Some(pack),
            ..AssetMap::new(capacity)
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots holding a loaded asset.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pack(&self) -> Option<&Pak<'a>> {
        self.pack.as_ref()
    }

    pub fn pack_mut(&mut self) -> Option<&mut Pak<'a>> {
        self.pack.as_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Asset<'a>> {
        self.slots.iter().flatten().filter(|a| a.is_filled())
    }

    fn slot_of(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| {
            s.as_ref()
                .is_some_and(|a| a.is_filled() && a.name() == name)
        })
    }

    fn slot_of_id(&self, id: u32) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|a| a.id() == id))
    }

    /// First slot that is empty or holds an asset already freed in place.
    fn free_slot(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_ref().map_or(true, |a| !a.is_filled()))
    }

    fn next_id(&mut self) -> PakResult<u32> {
        self.last_id = self
            .last_id
            .checked_add(1)
            .ok_or_else(|| PakError::Capacity("asset ids exhausted".into()))?;
        Ok(self.last_id)
    }

    /// Return the asset called `name`, loading it on a miss.
    ///
    /// With a pak attached `name` is an entry name, otherwise a filesystem path. A fresh
    /// load is cached in the first free slot; when every slot is taken it is returned
    /// uncached as [`Cow::Owned`], still with its own id. A failed load leaves the slot
    /// table unchanged.
    pub fn get(&mut self, name: &str) -> PakResult<Cow<'_, Asset<'a>>> {
        let key = match self.pack {
            Some(_) => fit_name(name)?,
            None => name.to_string(),
        };

        if let Some(i) = self.slot_of(&key) {
            return self.slots[i]
                .as_ref()
                .map(Cow::Borrowed)
                .ok_or_else(|| PakError::NotFound(key));
        }

        let mut asset = match &self.pack {
            Some(pak) => {
                let index = pak.find(&key).inspect_err(|_| {
                    tracing::warn!(entry = %key, "asset not found in pak")
                })?;
                Asset::from_pack(&key, pak.extract(index)?)
            }
            None => load(name)?,
        };
        asset.id = self.next_id()?;

        match self.free_slot() {
            Some(slot) => Ok(Cow::Borrowed(&*self.slots[slot].insert(asset))),
            None => {
                tracing::debug!(
                    entry = %key,
                    capacity = self.slots.len(),
                    "asset map full, returning uncached asset"
                );
                Ok(Cow::Owned(asset))
            }
        }
    }

    /// Track an asset loaded elsewhere. Returns its new id.
    pub fn add(&mut self, mut asset: Asset<'a>) -> PakResult<u32> {
        let slot = self.free_slot().ok_or_else(|| {
            tracing::warn!(capacity = self.slots.len(), "asset map is full");
            PakError::Capacity(format!("asset map is full ({} slots)", self.slots.len()))
        })?;
        let id = self.next_id()?;
        asset.id = id;
        self.slots[slot] = Some(asset);
        Ok(id)
    }

    pub fn get_id(&self, id: u32) -> Option<&Asset<'a>> {
        self.slots.iter().flatten().find(|a| a.id() == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Asset<'a>> {
        self.slots.iter_mut().flatten().find(|a| a.id() == id)
    }

    /// Release the asset called `name` and free its slot.
    pub fn remove(&mut self, name: &str) -> PakResult<()> {
        let i = self.slot_of(name).ok_or_else(|| {
            tracing::warn!(entry = name, "no such asset in map");
            PakError::NotFound(name.to_string())
        })?;
        self.slots[i] = None;
        Ok(())
    }

    /// Release the asset with id `id` and free its slot.
    pub fn remove_id(&mut self, id: u32) -> PakResult<()> {
        let i = self.slot_of_id(id).ok_or_else(|| {
            tracing::warn!(id, "no asset with this id in map");
            PakError::NotFound(format!("asset id {id}"))
        })?;
        self.slots[i] = None;
        Ok(())
    }

    /// Mark an asset for release on the next [`AssetMap::update`].
    pub fn request_free(&mut self, id: u32) -> PakResult<()> {
        let asset = self
            .get_mut(id)
            .ok_or_else(|| PakError::NotFound(format!("asset id {id}")))?;
        asset.request_free();
        Ok(())
    }

    /// Release every loaded asset with a pending free request. Returns how many were released.
    pub fn update(&mut self) -> usize {
        let mut swept = 0;
        for slot in &mut self.slots {
            let pending = slot
                .as_ref()
                .is_some_and(|a| a.is_filled() && a.state() == Lifecycle::PendingFree);
            if pending {
                *slot = None;
                swept += 1;
            }
        }
        if swept > 0 {
            tracing::debug!(swept, "released assets");
        }
        swept
    }

    /// Release every asset in the map.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    /// Store every cached asset missing from the backing pak into it, then write the pak.
    pub fn write(&mut self) -> PakResult<()> {
        let Some(pack) = self.pack.as_mut() else {
            tracing::warn!("no pak file to write to");
            return Err(PakError::Argument("asset map has no pak to write to".into()));
        };

        for asset in self.slots.iter().flatten() {
            if asset.name().is_empty() || !asset.is_filled() {
                continue;
            }
            if pack.find(asset.name()).is_err() {
                pack.add_memory(asset.name(), asset.bytes())?;
            }
        }
        pack.write()
    }

    /// Release every asset and close the backing pak, flushing its pending changes.
    pub fn close(mut self) -> PakResult<()> {
        self.clear();
        match self.pack.take() {
            Some(pack) => pack.close(),
            None => Ok(()),
        }
    }
}
