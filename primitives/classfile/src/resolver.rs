//! Class resolution over a search path.
//!
//! The search path is the union of project locations (directories or
//! archives holding the application's own classes) and class-path locations
//! (dependency archives). Project entries take precedence on name
//! collision. The resolver indexes every location at `open` time and is
//! immutable afterwards; parsed records are cached by canonical name, never
//! by file location. A class that cannot be located or parsed resolves to a
//! cached synthetic record so analysis continues.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use log::{debug, warn};
use types::{TypeLattice, TypeRef};
use walkdir::WalkDir;

use crate::record::ClassRecord;
use crate::{ClassError, Result};

#[derive(Debug)]
enum ClassSource {
    /// A `.class` file under a directory root.
    File(PathBuf),
    /// Bytes read out of an archive at `open` time.
    Archived(Vec<u8>),
}

/// The class resolver: locate, parse and cache class records.
pub struct ClassResolver {
    sources: HashMap<String, ClassSource>,
    project_classes: Vec<String>,
    cache: RwLock<HashMap<String, Arc<ClassRecord>>>,
}

impl ClassResolver {
    /// Index all locations. Project locations are scanned for resources;
    /// both location sets serve type resolution, project entries first on
    /// collision.
    pub fn open(project: &[PathBuf], classpath: &[PathBuf]) -> Result<Self> {
        let mut sources = HashMap::new();
        let mut project_classes = Vec::new();

        for location in project {
            let mut names = index_location(location, &mut sources)?;
            project_classes.append(&mut names);
        }
        for location in classpath {
            index_location(location, &mut sources)?;
        }

        project_classes.sort();
        project_classes.dedup();
        debug!(
            "search path indexed: {} classes, {} from project locations",
            sources.len(),
            project_classes.len()
        );
        Ok(Self { sources, project_classes, cache: RwLock::new(HashMap::new()) })
    }

    /// Canonical names of the classes found in project locations, sorted.
    pub fn project_classes(&self) -> &[String] { &self.project_classes }

    /// Whether the class can be located on the search path.
    pub fn can_resolve(&self, fqcn: &str) -> bool { self.sources.contains_key(fqcn) }

    /// The record for a canonical name. Never fails: unresolvable and
    /// unparseable classes yield a cached synthetic record and a warning.
    pub fn get(&self, fqcn: &str) -> Arc<ClassRecord> {
        if let Some(record) = self.cache.read().ok().and_then(|c| c.get(fqcn).cloned()) {
            return record;
        }

        let record = Arc::new(self.load(fqcn));
        if let Ok(mut cache) = self.cache.write() {
            // Another worker may have raced us here; keep the first record
            // so `get` stays referentially transparent.
            return cache.entry(fqcn.to_string()).or_insert(record).clone();
        }
        record
    }

    fn load(&self, fqcn: &str) -> ClassRecord {
        let bytes = match self.sources.get(fqcn) {
            Some(ClassSource::Archived(bytes)) => Ok(bytes.clone()),
            Some(ClassSource::File(path)) => std::fs::read(path).map_err(|source| {
                ClassError::Io { path: path.display().to_string(), source }
            }),
            None => {
                warn!("class not found on search path: {}", fqcn);
                return ClassRecord::synthetic(fqcn);
            }
        };

        match bytes.and_then(|b| ClassRecord::parse(&b)) {
            Ok(record) => record,
            Err(e) => {
                warn!("failed to parse {}: {}", fqcn, e);
                ClassRecord::synthetic(fqcn)
            }
        }
    }

    /// Superclass chain starting at `fqcn` itself, ending at the last
    /// resolvable ancestor.
    pub fn superclass_chain(&self, fqcn: &str) -> Vec<String> {
        let mut chain = vec![fqcn.to_string()];
        let mut current = fqcn.to_string();
        while let Some(super_name) = self.get(&current).super_name.clone() {
            if chain.contains(&super_name) {
                break;
            }
            chain.push(super_name.clone());
            current = super_name;
        }
        chain
    }

    fn fully_resolvable(&self, chain: &[String]) -> bool {
        chain.last().map(String::as_str) == Some("java.lang.Object")
    }
}

impl TypeLattice for ClassResolver {
    fn common_supertype(&self, a: &TypeRef, b: &TypeRef) -> Option<TypeRef> {
        if a.name() == b.name() {
            return Some(a.clone());
        }
        let chain_a = self.superclass_chain(a.name());
        let chain_b = self.superclass_chain(b.name());
        if !self.fully_resolvable(&chain_a) || !self.fully_resolvable(&chain_b) {
            return None;
        }
        chain_b.iter().find(|name| chain_a.contains(*name)).map(|name| TypeRef::new(name.clone()))
    }
}

fn index_location(
    location: &Path,
    sources: &mut HashMap<String, ClassSource>,
) -> Result<Vec<String>> {
    if location.is_dir() {
        index_directory(location, sources)
    } else {
        index_archive(location, sources)
    }
}

fn index_directory(
    root: &Path,
    sources: &mut HashMap<String, ClassSource>,
) -> Result<Vec<String>> {
    if !root.exists() {
        return Err(ClassError::Io {
            path: root.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
        });
    }
    let mut names = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("class") {
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else { continue };
        let Some(fqcn) = fqcn_from_relative(relative) else { continue };
        sources.entry(fqcn.clone()).or_insert_with(|| ClassSource::File(path.to_path_buf()));
        names.push(fqcn);
    }
    Ok(names)
}

fn index_archive(
    archive_path: &Path,
    sources: &mut HashMap<String, ClassSource>,
) -> Result<Vec<String>> {
    let file = std::fs::File::open(archive_path).map_err(|source| ClassError::Io {
        path: archive_path.display().to_string(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ClassError::Archive {
        path: archive_path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut names = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| ClassError::Archive {
            path: archive_path.display().to_string(),
            message: e.to_string(),
        })?;
        if !entry.name().ends_with(".class") {
            continue;
        }
        let Some(fqcn) = fqcn_from_entry_name(entry.name()) else { continue };
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes).map_err(|source| ClassError::Io {
            path: archive_path.display().to_string(),
            source,
        })?;
        sources.entry(fqcn.clone()).or_insert(ClassSource::Archived(bytes));
        names.push(fqcn);
    }
    Ok(names)
}

fn fqcn_from_relative(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        parts.push(component.as_os_str().to_str()?);
    }
    let joined = parts.join(".");
    let fqcn = joined.strip_suffix(".class")?;
    filter_infrastructure(fqcn)
}

fn fqcn_from_entry_name(name: &str) -> Option<String> {
    let stripped = name.strip_suffix(".class")?;
    filter_infrastructure(&stripped.replace('/', "."))
}

fn filter_infrastructure(fqcn: &str) -> Option<String> {
    // Module and package descriptors are not classes.
    if fqcn.ends_with("module-info") || fqcn.ends_with("package-info") {
        return None;
    }
    Some(fqcn.to_string())
}
