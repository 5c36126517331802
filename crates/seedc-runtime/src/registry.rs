//! The dynamic module registry.
//!
//! Modules enter the registry through [`ModuleRegistry::load`], either
//! from an explicit path or by searching the configured roots, and every
//! load of the same name shares one reference-counted entry. Resident
//! modules registered with [`ModuleRegistry::register_resident`] stay
//! loaded for the life of the registry.
//!
//! Linkage is lazy and tolerant: [`ModuleRegistry::resolve_imports`]
//! binds each declared import to a provider export, reports the ones it
//! cannot bind as warnings, and can be re-run as providers appear.
//! Declared dependencies form a graph that
//! [`ModuleRegistry::dependency_order`] sorts so dependencies come
//! before their dependents.

use std::fs;
use std::path::{Path, PathBuf};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use seedc_core::{
    Architecture, Diagnostics, ExportSignature, ModuleError, ModuleKind, NativeExport,
    NativeModuleFile, Span, Target,
};

/// Handle to a module slot. Stale after the module is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(u32);

impl ModuleId {
    /// The slot index behind the handle.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// One declared import of a module, bound to a provider export once
/// resolution finds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleImport {
    /// Name of the module expected to provide the symbol.
    pub provider: String,
    /// Exported symbol name.
    pub symbol: String,
    /// Whether the import has been bound.
    pub resolved: bool,
    /// Absolute address of the export, provider base plus export offset.
    pub address: u64,
    /// Signature recorded from the provider's export table.
    pub signature: ExportSignature,
}

/// A module held by the registry.
#[derive(Debug)]
pub struct LoadedModule {
    name: String,
    path: Option<PathBuf>,
    kind: ModuleKind,
    architecture: Architecture,
    entry_point: u32,
    code: Vec<u8>,
    data: Vec<u8>,
    exports: Vec<NativeExport>,
    export_index: FxHashMap<String, usize>,
    imports: Vec<ModuleImport>,
    resident: bool,
    ref_count: u32,
}

impl LoadedModule {
    fn from_file(
        name: String,
        path: Option<PathBuf>,
        file: NativeModuleFile,
        resident: bool,
    ) -> Self {
        let mut export_index =
            FxHashMap::with_capacity_and_hasher(file.exports.len(), Default::default());
        for (index, export) in file.exports.iter().enumerate() {
            export_index.insert(export.name.clone(), index);
        }
        Self {
            name,
            path,
            kind: file.kind,
            architecture: file.architecture,
            entry_point: file.entry_point,
            code: file.code,
            data: file.data,
            exports: file.exports,
            export_index,
            imports: Vec::new(),
            resident,
            ref_count: 1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file the module was loaded from, if it came from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn entry_point(&self) -> u32 {
        self.entry_point
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Address of the module's code in this process, the base that
    /// resolved import addresses are relative to.
    pub fn base_address(&self) -> u64 {
        self.code.as_ptr() as u64
    }

    pub fn exports(&self) -> &[NativeExport] {
        &self.exports
    }

    /// Look up an export by name.
    pub fn find_export(&self, name: &str) -> Option<&NativeExport> {
        self.export_index.get(name).map(|&index| &self.exports[index])
    }

    pub fn imports(&self) -> &[ModuleImport] {
        &self.imports
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    pub fn is_resident(&self) -> bool {
        self.resident
    }
}

/// Configuration for a [`ModuleRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Directories scanned when a module is loaded without a path.
    pub search_roots: Vec<PathBuf>,
    /// Target whose arch-tagged file names are also searched.
    pub target: Target,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            search_roots: vec![
                PathBuf::from("."),
                PathBuf::from("modules"),
                PathBuf::from("build"),
            ],
            target: Target::host(),
        }
    }
}

/// Reference-counted table of loaded modules with lazy import linkage
/// and a dependency graph.
#[derive(Debug)]
pub struct ModuleRegistry {
    slots: Vec<Option<LoadedModule>>,
    names: FxHashMap<String, ModuleId>,
    graph: DiGraph<ModuleId, ()>,
    nodes: FxHashMap<ModuleId, NodeIndex>,
    roots: Vec<PathBuf>,
    target: Target,
}

impl ModuleRegistry {
    /// Creates a registry with the default search roots and the host
    /// target.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Creates a registry that searches for modules named after the
    /// given target.
    pub fn with_target(target: Target) -> Self {
        Self::with_config(RegistryConfig {
            target,
            ..RegistryConfig::default()
        })
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            slots: Vec::new(),
            names: FxHashMap::default(),
            graph: DiGraph::new(),
            nodes: FxHashMap::default(),
            roots: config.search_roots,
            target: config.target,
        }
    }

    // ========================================================================
    // Loading and lookup
    // ========================================================================

    /// Appends a directory to the module search roots.
    pub fn add_search_root(&mut self, root: impl Into<PathBuf>) {
        self.roots.push(root.into());
    }

    /// The directories searched when no explicit path is given.
    pub fn search_roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Loads a module, or bumps the reference count if a module with
    /// this name is already loaded.
    ///
    /// Without an explicit path the search roots are scanned for
    /// `{name}.native` and the target-tagged variant. A file that fails
    /// container validation leaves no table entry.
    pub fn load(&mut self, name: &str, path: Option<&Path>) -> Result<ModuleId, ModuleError> {
        if let Some(&id) = self.names.get(name) {
            let module = self.get_mut(id)?;
            module.ref_count += 1;
            return Ok(id);
        }
        let file_path = match path {
            Some(path) => path.to_path_buf(),
            None => self.locate(name)?,
        };
        let bytes = fs::read(&file_path).map_err(|error| ModuleError::ReadFailed {
            path: file_path.display().to_string(),
            detail: error.to_string(),
        })?;
        let file = NativeModuleFile::from_bytes(&bytes)?;
        Ok(self.install(name.to_string(), Some(file_path), file, false))
    }

    /// Registers a module from memory that is never released, no matter
    /// how often it is unloaded. Registering the same name again returns
    /// the existing entry.
    pub fn register_resident(&mut self, name: &str, bytes: &[u8]) -> Result<ModuleId, ModuleError> {
        if let Some(id) = self.find(name) {
            return Ok(id);
        }
        let file = NativeModuleFile::from_bytes(bytes)?;
        Ok(self.install(name.to_string(), None, file, true))
    }

    /// Handle of the loaded module with this name, if any.
    pub fn find(&self, name: &str) -> Option<ModuleId> {
        self.names.get(name).copied()
    }

    pub fn get(&self, id: ModuleId) -> Result<&LoadedModule, ModuleError> {
        self.slots
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(ModuleError::StaleHandle { id: id.0 })
    }

    pub fn get_mut(&mut self, id: ModuleId) -> Result<&mut LoadedModule, ModuleError> {
        self.slots
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(ModuleError::StaleHandle { id: id.0 })
    }

    /// Number of live modules.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Drops one reference. The module is released when the count
    /// reaches zero; resident modules are never released.
    pub fn unload(&mut self, id: ModuleId) -> Result<(), ModuleError> {
        let module = self.get_mut(id)?;
        if module.resident {
            return Ok(());
        }
        module.ref_count -= 1;
        if module.ref_count > 0 {
            return Ok(());
        }
        let name = module.name.clone();
        self.names.remove(&name);
        if let Some(node) = self.nodes.remove(&id) {
            self.graph.remove_node(node);
            // remove_node swaps the last node into the freed index.
            if let Some(&moved) = self.graph.node_weight(node) {
                self.nodes.insert(moved, node);
            }
        }
        self.slots[id.0 as usize] = None;
        Ok(())
    }

    fn locate(&self, name: &str) -> Result<PathBuf, ModuleError> {
        let file_names = [
            format!("{name}.native"),
            self.target.native_file_name(name),
        ];
        for root in &self.roots {
            for file_name in &file_names {
                let candidate = root.join(file_name);
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }
        let searched = self
            .roots
            .iter()
            .map(|root| root.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(ModuleError::FileNotFound {
            name: name.to_string(),
            searched,
        })
    }

    fn install(
        &mut self,
        name: String,
        path: Option<PathBuf>,
        file: NativeModuleFile,
        resident: bool,
    ) -> ModuleId {
        let module = LoadedModule::from_file(name.clone(), path, file, resident);
        let id = match self.slots.iter().position(Option::is_none) {
            Some(index) => {
                self.slots[index] = Some(module);
                ModuleId(index as u32)
            }
            None => {
                self.slots.push(Some(module));
                ModuleId((self.slots.len() - 1) as u32)
            }
        };
        self.names.insert(name, id);
        let node = self.graph.add_node(id);
        self.nodes.insert(id, node);
        id
    }

    // ========================================================================
    // Import resolution
    // ========================================================================

    /// Declares that a module imports `symbol` from `provider`. The
    /// import starts unresolved.
    pub fn add_import(
        &mut self,
        id: ModuleId,
        provider: &str,
        symbol: &str,
    ) -> Result<(), ModuleError> {
        let module = self.get_mut(id)?;
        module.imports.push(ModuleImport {
            provider: provider.to_string(),
            symbol: symbol.to_string(),
            resolved: false,
            address: 0,
            signature: ExportSignature::default(),
        });
        Ok(())
    }

    /// Binds every unresolved import of a module whose provider export
    /// can be found, and returns how many were bound.
    ///
    /// A missing provider or missing symbol is reported as a warning and
    /// skipped, never an error; running resolution again picks up
    /// providers loaded since. Already resolved imports are left alone.
    pub fn resolve_imports(
        &mut self,
        id: ModuleId,
        diagnostics: &mut Diagnostics,
    ) -> Result<usize, ModuleError> {
        let module = self.get(id)?;
        let module_name = module.name.clone();
        let mut updates = Vec::new();
        for (index, import) in module.imports.iter().enumerate() {
            if import.resolved {
                continue;
            }
            let Some(provider_id) = self.find(&import.provider) else {
                diagnostics.warning(
                    format!(
                        "import '{}' unresolved: module '{}' is not loaded",
                        import.symbol, import.provider
                    ),
                    Some(&module_name),
                    Span::point(0, 0),
                );
                continue;
            };
            let provider = self.get(provider_id)?;
            let Some(export) = provider.find_export(&import.symbol) else {
                diagnostics.warning(
                    format!(
                        "import '{}' unresolved: module '{}' does not export it",
                        import.symbol, import.provider
                    ),
                    Some(&module_name),
                    Span::point(0, 0),
                );
                continue;
            };
            let address = provider.base_address() + export.offset;
            updates.push((index, address, export.signature));
        }
        let resolved = updates.len();
        let module = self.get_mut(id)?;
        for (index, address, signature) in updates {
            let import = &mut module.imports[index];
            import.address = address;
            import.signature = signature;
            import.resolved = true;
        }
        Ok(resolved)
    }

    // ========================================================================
    // Dependency graph
    // ========================================================================

    /// Records that `from` depends on `to`. Duplicate edges collapse.
    pub fn add_dependency(&mut self, from: ModuleId, to: ModuleId) -> Result<(), ModuleError> {
        self.get(from)?;
        self.get(to)?;
        let from_node = self.nodes[&from];
        let to_node = self.nodes[&to];
        self.graph.update_edge(from_node, to_node, ());
        Ok(())
    }

    /// All live modules ordered so every dependency comes before its
    /// dependents.
    pub fn dependency_order(&self) -> Result<Vec<ModuleId>, ModuleError> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order
                .into_iter()
                .rev()
                .filter_map(|node| self.graph.node_weight(node).copied())
                .collect()),
            Err(cycle) => {
                let name = self
                    .graph
                    .node_weight(cycle.node_id())
                    .and_then(|&id| self.get(id).ok())
                    .map(|module| module.name.clone())
                    .unwrap_or_default();
                Err(ModuleError::CircularDependency { name })
            }
        }
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_module(export: &str) -> Vec<u8> {
        let mut file = NativeModuleFile::new(Architecture::X86_64, ModuleKind::User);
        file.code = vec![0xC3; 32];
        file.exports.push(NativeExport::function(
            export,
            0,
            8,
            ExportSignature::new(1, true),
        ));
        file.to_bytes().unwrap()
    }

    fn registry() -> ModuleRegistry {
        ModuleRegistry::with_target(Target::X86_64)
    }

    fn scratch_dir(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("seedc-registry-{test}"));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_module(dir: &Path, file_name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn loading_from_an_explicit_path_round_trips() {
        let dir = scratch_dir("explicit");
        let path = write_module(&dir, "math.native", &sample_module("add"));
        let mut registry = registry();

        let id = registry.load("math", Some(&path)).unwrap();
        let module = registry.get(id).unwrap();
        assert_eq!(module.name(), "math");
        assert_eq!(module.kind(), ModuleKind::User);
        assert_eq!(module.architecture(), Architecture::X86_64);
        assert_eq!(module.ref_count(), 1);
        assert_eq!(module.path(), Some(path.as_path()));
        assert!(!module.is_resident());
        let export = module.find_export("add").unwrap();
        assert_eq!(export.offset, 0);
        assert_eq!(export.signature.param_count, 1);
        assert!(module.find_export("sub").is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn repeated_loads_share_one_entry() {
        let dir = scratch_dir("refcount");
        let path = write_module(&dir, "game.native", &sample_module("main"));
        let mut registry = registry();

        let first = registry.load("game", Some(&path)).unwrap();
        let second = registry.load("game", None).unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(first).unwrap().ref_count(), 2);

        registry.unload(first).unwrap();
        assert!(registry.find("game").is_some());
        assert_eq!(registry.get(first).unwrap().ref_count(), 1);

        registry.unload(first).unwrap();
        assert!(registry.find("game").is_none());
        assert!(registry.is_empty());
        assert_eq!(
            registry.get(first).unwrap_err(),
            ModuleError::StaleHandle { id: first.index() }
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn loading_searches_the_roots() {
        let dir = scratch_dir("roots");
        write_module(&dir, "plain.native", &sample_module("a"));
        let tagged = Target::X86_64.native_file_name("tagged");
        write_module(&dir, &tagged, &sample_module("b"));
        let mut registry = registry();
        registry.add_search_root(&dir);

        assert!(registry.load("plain", None).is_ok());
        assert!(registry.load("tagged", None).is_ok());
        assert_eq!(registry.len(), 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn config_controls_the_search_roots() {
        let dir = scratch_dir("config");
        write_module(&dir, "cfg.native", &sample_module("f"));
        let mut registry = ModuleRegistry::with_config(RegistryConfig {
            search_roots: vec![dir.clone()],
            target: Target::X86_64,
        });
        assert_eq!(registry.search_roots().len(), 1);
        assert!(registry.load("cfg", None).is_ok());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_files_name_the_searched_roots() {
        let mut registry = registry();
        let err = registry.load("nowhere", None).unwrap_err();
        match &err {
            ModuleError::FileNotFound { name, searched } => {
                assert_eq!(name, "nowhere");
                assert!(searched.contains("modules"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("nowhere"));
    }

    #[test]
    fn invalid_containers_leave_no_entry() {
        let dir = scratch_dir("invalid");
        let path = write_module(&dir, "broken.native", b"BADCBADCBADC");
        let mut registry = registry();

        let err = registry.load("broken", Some(&path)).unwrap_err();
        assert!(matches!(err, ModuleError::Container(_)));
        assert!(registry.find("broken").is_none());
        assert!(registry.is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unreadable_paths_report_read_failures() {
        let mut registry = registry();
        let path = Path::new("/nonexistent/ghost.native");
        let err = registry.load("ghost", Some(path)).unwrap_err();
        match err {
            ModuleError::ReadFailed { path, .. } => assert!(path.contains("ghost.native")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn imports_resolve_against_loaded_providers() {
        let dir = scratch_dir("resolve");
        let math = write_module(&dir, "mathlib.native", &sample_module("add"));
        let game = write_module(&dir, "game.native", &sample_module("main"));
        let mut registry = registry();
        let math = registry.load("mathlib", Some(&math)).unwrap();
        let game = registry.load("game", Some(&game)).unwrap();
        registry.add_import(game, "mathlib", "add").unwrap();

        let mut diagnostics = Diagnostics::new();
        let resolved = registry.resolve_imports(game, &mut diagnostics).unwrap();
        assert_eq!(resolved, 1);
        assert!(diagnostics.is_empty());

        let base = registry.get(math).unwrap().base_address();
        let import = &registry.get(game).unwrap().imports()[0];
        assert!(import.resolved);
        assert_eq!(import.address, base);
        assert_eq!(import.signature, ExportSignature::new(1, true));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_providers_warn_and_continue() {
        let dir = scratch_dir("no-provider");
        let path = write_module(&dir, "game.native", &sample_module("main"));
        let mut registry = registry();
        let game = registry.load("game", Some(&path)).unwrap();
        registry.add_import(game, "missing", "f").unwrap();

        let mut diagnostics = Diagnostics::new();
        let resolved = registry.resolve_imports(game, &mut diagnostics).unwrap();
        assert_eq!(resolved, 0);
        assert_eq!(diagnostics.warning_count(), 1);
        assert!(!registry.get(game).unwrap().imports()[0].resolved);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_symbols_warn_and_continue() {
        let dir = scratch_dir("no-symbol");
        let math = write_module(&dir, "mathlib.native", &sample_module("add"));
        let game = write_module(&dir, "game.native", &sample_module("main"));
        let mut registry = registry();
        registry.load("mathlib", Some(&math)).unwrap();
        let game = registry.load("game", Some(&game)).unwrap();
        registry.add_import(game, "mathlib", "sub").unwrap();

        let mut diagnostics = Diagnostics::new();
        let resolved = registry.resolve_imports(game, &mut diagnostics).unwrap();
        assert_eq!(resolved, 0);
        assert_eq!(diagnostics.warning_count(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn resolution_is_idempotent() {
        let dir = scratch_dir("idempotent");
        let math = write_module(&dir, "mathlib.native", &sample_module("add"));
        let game = write_module(&dir, "game.native", &sample_module("main"));
        let mut registry = registry();
        registry.load("mathlib", Some(&math)).unwrap();
        let game = registry.load("game", Some(&game)).unwrap();
        registry.add_import(game, "mathlib", "add").unwrap();

        let mut diagnostics = Diagnostics::new();
        assert_eq!(registry.resolve_imports(game, &mut diagnostics).unwrap(), 1);
        let address = registry.get(game).unwrap().imports()[0].address;

        let mut diagnostics = Diagnostics::new();
        assert_eq!(registry.resolve_imports(game, &mut diagnostics).unwrap(), 0);
        assert!(diagnostics.is_empty());
        let import = &registry.get(game).unwrap().imports()[0];
        assert!(import.resolved);
        assert_eq!(import.address, address);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn resident_modules_survive_unload() {
        let mut registry = registry();
        let id = registry
            .register_resident("libc", &sample_module("put_char"))
            .unwrap();
        assert!(registry.get(id).unwrap().is_resident());

        registry.unload(id).unwrap();
        registry.unload(id).unwrap();
        assert!(registry.find("libc").is_some());
        assert_eq!(registry.get(id).unwrap().ref_count(), 1);

        let again = registry
            .register_resident("libc", &sample_module("put_char"))
            .unwrap();
        assert_eq!(again, id);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn dependency_order_puts_dependencies_first() {
        let dir = scratch_dir("order");
        let mut registry = registry();
        let mut ids = Vec::new();
        for name in ["a", "b", "c"] {
            let path = write_module(&dir, &format!("{name}.native"), &sample_module("f"));
            ids.push(registry.load(name, Some(&path)).unwrap());
        }
        registry.add_dependency(ids[0], ids[1]).unwrap();
        registry.add_dependency(ids[1], ids[2]).unwrap();
        registry.add_dependency(ids[0], ids[1]).unwrap();

        let order = registry.dependency_order().unwrap();
        assert_eq!(order, vec![ids[2], ids[1], ids[0]]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn dependency_cycles_are_rejected() {
        let dir = scratch_dir("cycle");
        let a = write_module(&dir, "a.native", &sample_module("f"));
        let b = write_module(&dir, "b.native", &sample_module("g"));
        let mut registry = registry();
        let a = registry.load("a", Some(&a)).unwrap();
        let b = registry.load("b", Some(&b)).unwrap();
        registry.add_dependency(a, b).unwrap();
        registry.add_dependency(b, a).unwrap();

        let err = registry.dependency_order().unwrap_err();
        match &err {
            ModuleError::CircularDependency { name } => assert!(!name.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("circular"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn stale_handles_are_rejected() {
        let dir = scratch_dir("stale");
        let path = write_module(&dir, "gone.native", &sample_module("f"));
        let mut registry = registry();
        let id = registry.load("gone", Some(&path)).unwrap();
        registry.unload(id).unwrap();

        assert!(matches!(
            registry.get(id),
            Err(ModuleError::StaleHandle { .. })
        ));
        assert!(matches!(
            registry.unload(id),
            Err(ModuleError::StaleHandle { .. })
        ));
        assert!(matches!(
            registry.add_import(id, "x", "y"),
            Err(ModuleError::StaleHandle { .. })
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn released_slots_are_reused() {
        let dir = scratch_dir("slots");
        let a = write_module(&dir, "a.native", &sample_module("f"));
        let b = write_module(&dir, "b.native", &sample_module("g"));
        let c = write_module(&dir, "c.native", &sample_module("h"));
        let mut registry = registry();
        let a = registry.load("a", Some(&a)).unwrap();
        let _b = registry.load("b", Some(&b)).unwrap();
        registry.unload(a).unwrap();

        let c = registry.load("c", Some(&c)).unwrap();
        assert_eq!(c, a);
        assert_eq!(registry.get(c).unwrap().name(), "c");
        assert_eq!(registry.find("c"), Some(c));
        assert!(registry.find("a").is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
