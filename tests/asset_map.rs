//! Asset map behaviour against pak-backed and filesystem-backed sources.

use std::borrow::Cow;

use pakutil::asset::{AssetMap, Origin};
use pakutil::pak::{Pak, PakError};

#[test]
fn pack_backed_get_matches_direct_extract() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assets.pak");
    let texture: Vec<u8> = (0..512u32).map(|i| (i * 3) as u8).collect();

    let mut pak = Pak::open_file(&path).unwrap();
    pak.add_memory("tex.png", texture.clone()).unwrap();
    pak.add_memory("shader.glsl", &b"void main() {}"[..]).unwrap();
    pak.close().unwrap();

    let direct = {
        let pak = Pak::open_file(&path).unwrap();
        pak.extract(pak.find("tex.png").unwrap()).unwrap().into_owned()
    };

    let mut map = AssetMap::open_pack(&path, 8).unwrap();
    let asset = map.get("tex.png").unwrap();
    assert_eq!(asset.bytes(), &direct[..]);
    assert_eq!(asset.bytes(), &texture[..]);
    assert_eq!(asset.origin(), Origin::Pack);
    assert_eq!(asset.name(), "tex.png");
    let id = asset.id();

    // Cached: no second load, same id.
    assert_eq!(map.get("tex.png").unwrap().id(), id);
    assert_eq!(map.len(), 1);

    assert!(matches!(map.get("missing.png"), Err(PakError::NotFound(_))));
    assert_eq!(map.len(), 1);
}

#[test]
fn memory_pack_assets_borrow_the_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("m.pak");
    let mut pak = Pak::open_file(&path).unwrap();
    pak.add_memory("a", &b"abc"[..]).unwrap();
    pak.close().unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let mut map = AssetMap::with_pack(Pak::open_memory(&bytes).unwrap(), 2);
    assert_eq!(map.get("a").unwrap().bytes(), b"abc");
}

#[test]
fn filesystem_get_missing_leaves_slots_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let mut map = AssetMap::new(4);

    let missing = dir.path().join("missing.bin");
    let err = map.get(missing.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, PakError::Io(_)));
    assert!(map.is_empty());
    assert_eq!(map.capacity(), 4);
}

#[test]
fn filesystem_get_caches_and_assigns_ids() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    std::fs::write(&a, b"first").unwrap();
    std::fs::write(&b, b"second").unwrap();
    let (a, b) = (a.to_str().unwrap(), b.to_str().unwrap());

    let mut map = AssetMap::new(2);
    let id_a = map.get(a).unwrap().id();
    let asset_b = map.get(b).unwrap();
    assert_eq!(asset_b.bytes(), b"second");
    assert_eq!(asset_b.bytes_with_nul(), Some(&b"second\0"[..]));
    assert_eq!(asset_b.origin(), Origin::Filesystem);
    let id_b = asset_b.id();
    assert_ne!(id_a, id_b);

    assert_eq!(map.get(a).unwrap().id(), id_a);

    let c = dir.path().join("c.txt");
    std::fs::write(&c, b"third").unwrap();
    let c = c.to_str().unwrap();

    let third = map.get(c).unwrap();
    assert!(matches!(third, Cow::Owned(_)));
    assert_eq!(third.bytes(), b"third");
    let id_c = third.id();
    assert!(id_c > id_b);
    assert_eq!(map.len(), 2);
    assert!(map.get_id(id_c).is_none());

    // Still uncached: every full-map miss is a fresh load with a fresh id.
    assert!(map.get(c).unwrap().id() > id_c);
}

#[test]
fn pack_backed_get_accepts_untruncated_long_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long.pak");
    let long = format!("textures/{}.png", "x".repeat(70));

    let mut pak = Pak::open_file(&path).unwrap();
    pak.add_memory(&long, &b"pixels"[..]).unwrap();
    pak.close().unwrap();

    let mut map = AssetMap::open_pack(&path, 2).unwrap();
    let id = map.get(&long).unwrap().id();
    assert_eq!(map.get(&long).unwrap().bytes(), b"pixels");
    assert_eq!(map.get(&long).unwrap().id(), id);
    assert_eq!(map.len(), 1);
}

#[test]
fn deferred_free_then_reload_gets_fresh_id() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("a.txt");
    std::fs::write(&p, b"data").unwrap();
    let p = p.to_str().unwrap();

    let mut map = AssetMap::new(1);
    let id = map.get(p).unwrap().id();
    map.get_mut(id).unwrap().request_free();

    assert_eq!(map.len(), 1);
    assert_eq!(map.update(), 1);
    assert!(map.is_empty());

    let again = map.get(p).unwrap().id();
    assert!(again > id);
}

#[test]
fn write_stores_cached_assets_into_pack() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("w.pak");

    let mut pak = Pak::open_file(&path).unwrap();
    pak.add_memory("existing", &b"e"[..]).unwrap();
    pak.close().unwrap();

    let mut map = AssetMap::open_pack(&path, 4).unwrap();
    map.get("existing").unwrap();
    map.add(pakutil::Asset::from_memory("fresh", vec![9u8, 9, 9])).unwrap();
    map.write().unwrap();
    map.close().unwrap();

    let pak = Pak::open_file(&path).unwrap();
    assert_eq!(pak.count(), 2);
    assert_eq!(&*pak.extract(pak.find("fresh").unwrap()).unwrap(), &[9u8, 9, 9][..]);
    pak.verify().unwrap();
}
