#![forbid(unsafe_code)]

use std::io::Write;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use pakutil::asset;
use pakutil::pak::{
    content_hash, entry_name, fit_name, hex64, normalize_rel_path, prefixed, Pak, PakError, PakResult,
};

/// Expand command-line paths into `(entry name, file)` pairs, walking directories.
fn collect_files(paths: &[PathBuf]) -> PakResult<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();

    for p in paths {
        if !p.is_dir() {
            files.push((entry_name(p)?, p.clone()));
            continue;
        }

        let prefix = entry_name(p).unwrap_or_default();
        let mut found: Vec<(String, PathBuf)> = Vec::new();
        for ent in WalkDir::new(p).follow_links(false) {
            let ent = ent.map_err(|e| {
                let msg = e.to_string();
                let io = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, msg));
                PakError::Io(io)
            })?;

            if !ent.file_type().is_file() {
                continue;
            }
            let rel = normalize_rel_path(p, ent.path())?;
            found.push((prefixed(&prefix, &rel), ent.path().to_path_buf()));
        }
        found.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
        files.extend(found);
    }

    Ok(files)
}

pub fn add(pak_path: &Path, paths: &[PathBuf]) -> PakResult<()> {
    let mut pak = Pak::open_file(pak_path)?;

    let files = collect_files(paths)?;
    for (name, file) in &files {
        pak.add_file(name, file)?;
    }
    pak.write()?;

    for (name, _) in &files {
        match pak.find(&fit_name(name)?) {
            Ok(i) => println!("Added {name} at index: {i}"),
            Err(_) => println!("Failed to add {name} into pak file."),
        }
    }
    println!("pak contains: {} entries.", pak.count());
    pak.close()
}

pub fn remove(pak_path: &Path, names: &[String]) -> PakResult<()> {
    let mut pak = Pak::open_file(pak_path)?;

    let mut removed = Vec::new();
    for name in names {
        match pak.find(name) {
            Ok(i) => {
                pak.remove_index(i)?;
                removed.push(name);
            }
            Err(_) => println!("No match found for {name} in pak file"),
        }
    }
    pak.write()?;

    for name in removed {
        println!("Removed {name}");
    }
    pak.close()
}

pub fn check(pak_path: &Path, names: &[String]) -> PakResult<()> {
    let pak = Pak::open_file(pak_path)?;
    println!("pak count: {}", pak.count());

    for name in names {
        match pak.find(name) {
            Ok(i) => println!("Matched {name} at index {i} in pak file"),
            Err(_) => println!("No match found for {name} in pak file"),
        }
    }
    Ok(())
}

pub fn list(pak_path: &Path, verbose: bool) -> PakResult<()> {
    let pak = Pak::open_file(pak_path)?;
    println!("pak contains: {} entries.", pak.count());

    for (i, e) in pak.entries().iter().enumerate() {
        if verbose {
            let data = pak.extract(i)?;
            println!(
                "{i}: {}  off={} len={} hash={}",
                e.name,
                e.offset,
                e.size,
                hex64(content_hash(&data))
            );
        } else {
            println!("{i}: {}", e.name);
        }
    }
    Ok(())
}

pub fn data(pak_path: &Path, names: &[String]) -> PakResult<()> {
    let pak = Pak::open_file(pak_path)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for name in names {
        let Ok(i) = pak.find(name) else {
            eprintln!("No match found for {name} in pak file");
            continue;
        };
        let bytes = pak.extract(i)?;
        writeln!(out, "{name}:")?;
        out.write_all(&bytes)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Host path for an entry under `output`. Entry names never escape the output directory.
fn output_path(output: &Path, name: &str) -> PakResult<PathBuf> {
    let rel = Path::new(name);
    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(PakError::Argument(format!(
            "refusing to extract {name:?} outside the output directory"
        )));
    }
    Ok(output.join(rel))
}

pub fn extract(pak_path: &Path, output: &Path, names: &[String]) -> PakResult<()> {
    let pak = Pak::open_file(pak_path)?;
    std::fs::create_dir_all(output)?;

    for (i, e) in pak.entries().iter().enumerate() {
        if !names.is_empty() && !names.iter().any(|n| *n == e.name) {
            continue;
        }

        let out_path = output_path(output, &e.name)?;
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        asset::write(&out_path, &pak.extract(i)?)?;
        println!("{}", out_path.display());
    }
    Ok(())
}

pub fn verify(pak_path: &Path) -> PakResult<()> {
    let pak = Pak::open_file(pak_path)?;
    pak.verify()?;
    println!("ok: {} entries", pak.count());
    Ok(())
}
