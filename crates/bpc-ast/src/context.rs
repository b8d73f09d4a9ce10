//! The AST Context: owns every live node, assigns stable indices to
//! declarations and named types, tracks modules by unique ID, and supports
//! safe replacement and garbage collection.
//!
//! Grounded directly in `ASTContext` (`ast-context.cc`): `register_`,
//! `replace`, `lookup`, `updateModuleUID`, and `garbageCollect` follow its
//! semantics. Where the original compacts a vector of raw pointers, this
//! implementation tombstones dropped slots (`Vec<Option<Node>>`) instead of
//! physically shifting survivors — the Rust-idiomatic equivalent (the same
//! pattern `petgraph::StableGraph` uses) that keeps `NodeId` stable across a
//! GC round without a full reference rewrite.

use crate::error::{ContextError, InternalError, ProcessError};
use crate::id_path::ID;
use crate::ids::{DeclarationIndex, NodeId, TypeIndex};
use crate::node::{Declaration, ModuleDecl, ModuleUid, Node, NodeKind, UnqualifiedType};
use crate::scope::ScopeTable;
use bpc_common::diagnostics::DiagnosticSet;
use bpc_common::limits::MAX_GC_ROUNDS;
use bpc_common::location::Location;
use bpc_common::options::CompilerOptions;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::collaborators::Pass;

/// Owns every [`Node`] created during one compilation and the side tables
/// that give declarations and named types stable identity across rewrites.
pub struct Context {
    nodes: Vec<Option<Node>>,
    declarations_by_index: Vec<NodeId>,
    types_by_index: Vec<NodeId>,
    /// Mirrors a type declaration's `DeclarationIndex` onto its declared
    /// type's node, so looking up "which declaration names this type" is O(1).
    declaration_index_of_type: FxHashMap<NodeId, DeclarationIndex>,
    modules_by_uid: FxHashMap<ModuleUid, NodeId>,
    modules_by_path: FxHashMap<String, NodeId>,
    modules_by_import_key: FxHashMap<(ID, Option<NodeId>), NodeId>,
    dependencies: FxHashMap<DeclarationIndex, Vec<DeclarationIndex>>,
    root: Option<NodeId>,
    diagnostics: DiagnosticSet,
    scopes: ScopeTable,
    modified: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            declarations_by_index: Vec::new(),
            types_by_index: Vec::new(),
            declaration_index_of_type: FxHashMap::default(),
            modules_by_uid: FxHashMap::default(),
            modules_by_path: FxHashMap::default(),
            modules_by_import_key: FxHashMap::default(),
            dependencies: FxHashMap::default(),
            root: None,
            diagnostics: DiagnosticSet::new(),
            scopes: ScopeTable::new(),
            modified: false,
        }
    }

    // -----------------------------------------------------------------
    // Node storage
    // -----------------------------------------------------------------

    /// Allocates a new node, appends it to the live-node vector, and returns
    /// its identity. Every node in the tree is reachable from here.
    pub fn alloc(&mut self, location: Location, kind: NodeKind) -> NodeId {
        let id = NodeId::new((self.nodes.len() + 1) as u32);
        self.nodes.push(Some(Node::new(id, location, kind)));
        id
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.slot()]
            .as_ref()
            .expect("NodeId referenced after its slot was garbage collected")
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.slot()]
            .as_mut()
            .expect("NodeId referenced after its slot was garbage collected")
    }

    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    #[must_use]
    pub fn diagnostics(&self) -> &DiagnosticSet {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut DiagnosticSet {
        &mut self.diagnostics
    }

    #[must_use]
    pub fn scopes(&self) -> &ScopeTable {
        &self.scopes
    }

    pub fn scopes_mut(&mut self) -> &mut ScopeTable {
        &mut self.scopes
    }

    /// Whether any child replacement happened since the flag was last reset.
    #[must_use]
    pub fn modified(&self) -> bool {
        self.modified
    }

    pub fn reset_modified(&mut self) {
        self.modified = false;
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    /// Swaps child `old` of `parent` for `new`: `new`'s parent becomes
    /// `parent`, `old` is unparented (and will be collected once nothing
    /// else references it), and the context's modification flag is raised.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        let slot = self
            .node(parent)
            .children
            .iter()
            .position(|c| *c == old)
            .expect("replace_child: old is not a child of parent");
        self.node_mut(parent).children[slot] = new;
        self.node_mut(new).parent = Some(parent);
        self.node_mut(old).parent = None;
        self.modified = true;
    }

    // -----------------------------------------------------------------
    // Declaration / type registration
    // -----------------------------------------------------------------

    /// Idempotent: if `id` already carries a `DeclarationIndex`, returns it
    /// unchanged. Otherwise appends to `declarations_by_index` and writes
    /// the new index back into the declaration's header. If `id` is a type
    /// declaration, mirrors the index onto the declared type too.
    pub fn register_declaration(&mut self, id: NodeId) -> DeclarationIndex {
        let (existing, declared_ty) = {
            let decl = self.declaration(id);
            (decl.header().declaration_index, decl.declared_type())
        };
        if let Some(idx) = existing {
            return idx;
        }

        self.declarations_by_index.push(id);
        let idx = DeclarationIndex::new(self.declarations_by_index.len() as u32);
        self.declaration_mut(id).header_mut().declaration_index = Some(idx);

        if self.declaration(id).is_type_decl() {
            if let Some(ty) = declared_ty {
                self.declaration_index_of_type.insert(ty, idx);
            }
        }

        tracing::trace!(declaration_index = idx.get(), node = id.get(), "registered declaration");
        idx
    }

    /// As `register_declaration`, but for named types. Rejects the wildcard
    /// (`auto`) type, which by construction never has a stable identity.
    pub fn register_type(&mut self, id: NodeId) -> Result<TypeIndex, InternalError> {
        if matches!(self.unqualified_type(id), UnqualifiedType::Auto) {
            return Err(InternalError::WildcardTypeRegistration);
        }
        self.types_by_index.push(id);
        let idx = TypeIndex::new(self.types_by_index.len() as u32);
        tracing::trace!(type_index = idx.get(), node = id.get(), "registered type");
        Ok(idx)
    }

    /// `new` inherits `old`'s `DeclarationIndex`. If both are type
    /// declarations, the underlying types are also swapped so every `Name`
    /// resolving to `old`'s type now resolves to `new`'s without a scan.
    pub fn replace_declaration(&mut self, old: NodeId, new: NodeId) {
        let old_idx = self
            .declaration(old)
            .header()
            .declaration_index
            .expect("replace_declaration: old must already be registered");

        self.declaration_mut(new).header_mut().declaration_index = Some(old_idx);
        self.declarations_by_index[old_idx.slot()] = new;

        if let (Declaration::TypeDecl { ty: old_ty, .. }, Declaration::TypeDecl { ty: new_ty, .. }) =
            (self.declaration(old), self.declaration(new))
        {
            let (old_ty, new_ty) = (*old_ty, *new_ty);
            if let Some(pos) = self.types_by_index.iter().position(|t| *t == old_ty) {
                self.types_by_index[pos] = new_ty;
            }
            if let Some(decl_idx) = self.declaration_index_of_type.remove(&old_ty) {
                self.declaration_index_of_type.insert(new_ty, decl_idx);
            }
        }

        if let Some(parent) = self.node(old).parent {
            self.replace_child(parent, old, new);
        }

        tracing::trace!(declaration_index = old_idx.get(), "replaced declaration");
    }

    #[must_use]
    pub fn lookup_declaration(&self, idx: DeclarationIndex) -> NodeId {
        self.declarations_by_index[idx.slot()]
    }

    #[must_use]
    pub fn lookup_type(&self, idx: TypeIndex) -> NodeId {
        self.types_by_index[idx.slot()]
    }

    #[must_use]
    pub fn declaration_index_of_type(&self, ty: NodeId) -> Option<DeclarationIndex> {
        self.declaration_index_of_type.get(&ty).copied()
    }

    // -----------------------------------------------------------------
    // Modules
    // -----------------------------------------------------------------

    /// Constructs a fresh module declaration, registers it in all three
    /// module maps, and attaches it under the AST root.
    pub fn create_module(&mut self, uid: ModuleUid, extension: impl Into<String>, location: Location) -> NodeId {
        let extension = extension.into();
        let id = self.alloc(
            location,
            NodeKind::Declaration(Declaration::Module(ModuleDecl {
                header: crate::node::DeclarationHeader::new(uid.id.clone(), crate::node::Linkage::Public),
                uid: uid.clone(),
                extension,
                items: Vec::new(),
            })),
        );

        self.modules_by_uid.insert(uid.clone(), id);
        if let Some(path) = &uid.path {
            self.modules_by_path.insert(path.clone(), id);
        }
        self.modules_by_import_key.insert((uid.id.clone(), None), id);

        self.register_declaration(id);

        if let Some(root) = self.root {
            self.append_child(root, id);
        } else {
            self.root = Some(id);
        }

        id
    }

    /// Dedups module imports by `(id, scope)`: returns the existing module
    /// if one was already created for this key, otherwise creates a fresh
    /// one. The actual file search that would resolve `uid` into source text
    /// is the driver collaborator's job; this only owns the dedup/collision
    /// bookkeeping.
    pub fn resolve_or_create_module(
        &mut self,
        uid: ModuleUid,
        extension: impl Into<String>,
        importing_scope: Option<NodeId>,
        location: Location,
    ) -> NodeId {
        let key = (uid.id.clone(), importing_scope);
        if let Some(existing) = self.modules_by_import_key.get(&key) {
            return *existing;
        }
        let id = self.create_module(uid, extension, location);
        self.modules_by_import_key.insert(key, id);
        id
    }

    /// Updates all three module maps atomically. Fails if `new` collides
    /// with an already-registered UID.
    pub fn update_module_uid(&mut self, module: NodeId, new_uid: ModuleUid) -> Result<(), ContextError> {
        if self.modules_by_uid.contains_key(&new_uid) {
            return Err(ContextError::DuplicateModuleUid(new_uid.id));
        }

        let old_uid = match &self.node(module).kind {
            NodeKind::Declaration(Declaration::Module(m)) => m.uid.clone(),
            _ => panic!("update_module_uid: node is not a module declaration"),
        };

        self.modules_by_uid.remove(&old_uid);
        if let Some(path) = &old_uid.path {
            self.modules_by_path.remove(path);
        }
        self.modules_by_import_key.remove(&(old_uid.id.clone(), None));

        self.modules_by_uid.insert(new_uid.clone(), module);
        if let Some(path) = &new_uid.path {
            self.modules_by_path.insert(path.clone(), module);
        }
        self.modules_by_import_key.insert((new_uid.id.clone(), None), module);

        if let NodeKind::Declaration(Declaration::Module(m)) = &mut self.node_mut(module).kind {
            m.uid = new_uid;
        }

        Ok(())
    }

    #[must_use]
    pub fn module_by_uid(&self, uid: &ModuleUid) -> Option<NodeId> {
        self.modules_by_uid.get(uid).copied()
    }

    #[must_use]
    pub fn module_by_path(&self, path: &str) -> Option<NodeId> {
        self.modules_by_path.get(path).copied()
    }

    // -----------------------------------------------------------------
    // Dependency computation
    // -----------------------------------------------------------------

    /// Post-order traversal recording, for each top-level declaration, the
    /// other top-level declarations its definition references directly or
    /// through children. Enum constants collapse to their enum type. A
    /// visited-set per root declaration prevents infinite recursion on
    /// self-referential records; such cycles simply yield a declaration that
    /// lists itself.
    pub fn compute_dependencies(&mut self) {
        self.dependencies.clear();
        let top_level: Vec<(DeclarationIndex, NodeId)> = self
            .declarations_by_index
            .iter()
            .enumerate()
            .map(|(i, node)| (DeclarationIndex::new((i + 1) as u32), *node))
            .collect();

        for (idx, node) in &top_level {
            let mut found = Vec::new();
            let mut visited = std::collections::HashSet::new();
            self.collect_referenced_declarations(*node, *idx, &mut visited, &mut found);
            found.sort_by_key(|d: &DeclarationIndex| self.canonical_sort_key(*d));
            found.dedup();
            self.dependencies.insert(*idx, found);
        }
    }

    fn canonical_sort_key(&self, idx: DeclarationIndex) -> String {
        let node = self.lookup_declaration(idx);
        self.declaration(node)
            .header()
            .canonical_id
            .as_ref()
            .map(|id| id.as_str().to_string())
            .unwrap_or_else(|| self.declaration(node).header().id.as_str().to_string())
    }

    fn collect_referenced_declarations(
        &self,
        node: NodeId,
        owner: DeclarationIndex,
        visited: &mut std::collections::HashSet<NodeId>,
        found: &mut Vec<DeclarationIndex>,
    ) {
        if !visited.insert(node) {
            return;
        }

        if let NodeKind::Expression(crate::node::Expression::ResolvedName(referenced)) = &self.node(node).kind {
            found.push(if *referenced == owner { owner } else { *referenced });
        }
        if let NodeKind::UnqualifiedType(UnqualifiedType::ResolvedName(ty_idx)) = &self.node(node).kind {
            if let Some(decl_idx) = self.declaration_index_of_type(self.lookup_type(*ty_idx)) {
                found.push(decl_idx);
            }
        }

        let children: SmallVec<[NodeId; 4]> = self.node(node).children.clone();
        for child in children {
            self.collect_referenced_declarations(child, owner, visited, found);
        }
    }

    #[must_use]
    pub fn dependent_declarations(&self, d: DeclarationIndex) -> &[DeclarationIndex] {
        self.dependencies.get(&d).map(Vec::as_slice).unwrap_or(&[])
    }

    // -----------------------------------------------------------------
    // Garbage collection
    // -----------------------------------------------------------------

    /// Repeatedly partitions the live-node vector into reachable and
    /// unreachable, dropping the latter, until a full round drops nothing.
    /// Reachable means: transitively reachable from the root, or directly
    /// pinned by a context map (`declarations_by_index`, `types_by_index`).
    pub fn garbage_collect(&mut self) -> Result<(usize, usize), InternalError> {
        let mut total_dropped = 0;
        let mut rounds = 0;

        loop {
            let reachable = self.reachable_set();
            let mut dropped_this_round = 0;
            for slot in &mut self.nodes {
                if let Some(node) = slot {
                    if !reachable.contains(&node.id) {
                        *slot = None;
                        dropped_this_round += 1;
                    }
                }
            }

            total_dropped += dropped_this_round;
            rounds += 1;
            if dropped_this_round == 0 {
                break;
            }
            if rounds >= MAX_GC_ROUNDS {
                return Err(InternalError::GcDidNotConverge { rounds });
            }
        }

        let retained = self.nodes.iter().filter(|n| n.is_some()).count();
        tracing::debug!(retained, dropped = total_dropped, rounds, "garbage collection complete");
        Ok((retained, total_dropped))
    }

    fn reachable_set(&self) -> std::collections::HashSet<NodeId> {
        let mut seen = std::collections::HashSet::new();
        let mut stack: Vec<NodeId> = Vec::new();

        if let Some(root) = self.root {
            stack.push(root);
        }
        stack.extend(self.declarations_by_index.iter().copied());
        stack.extend(self.types_by_index.iter().copied());

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(node) = &self.nodes[id.slot()] {
                stack.extend(node.children.iter().copied());
            }
        }
        seen
    }

    // -----------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------

    /// Resets every map and the node vector, then runs a final (trivially
    /// empty) GC pass for symmetry with a context that is about to be
    /// reused by test scaffolding rather than dropped outright.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.declarations_by_index.clear();
        self.types_by_index.clear();
        self.declaration_index_of_type.clear();
        self.modules_by_uid.clear();
        self.modules_by_path.clear();
        self.modules_by_import_key.clear();
        self.dependencies.clear();
        self.root = None;
        self.diagnostics.clear();
        self.scopes.clear();
        self.modified = false;
        let _ = self.garbage_collect();
    }

    /// Debug snapshot of the index tables, emitted after each resolver round
    /// when `CompilerOptions.dump_iterations` is set.
    pub fn dump_state(&self, round: u32) {
        tracing::debug!(
            round,
            declarations = self.declarations_by_index.len(),
            types = self.types_by_index.len(),
            live_nodes = self.nodes.iter().filter(|n| n.is_some()).count(),
            "resolver iteration snapshot"
        );
    }

    // -----------------------------------------------------------------
    // Orchestration
    // -----------------------------------------------------------------

    /// The orchestrated pipeline: init → validate-pre → resolve (to
    /// fixpoint) → validate-post → transform. Terminates early on the first
    /// stage that leaves a non-empty error set.
    pub fn process_ast(
        &mut self,
        root: NodeId,
        validate_pre: &mut dyn Pass,
        resolve: &mut dyn Pass,
        validate_post: &mut dyn Pass,
        transform: &mut dyn Pass,
        options: &CompilerOptions,
    ) -> Result<(), ProcessError> {
        self.root = Some(root);
        self.diagnostics.clear();

        validate_pre.run(self, root)?;
        if self.diagnostics.has_errors() {
            return Ok(());
        }

        let mut rounds = 0u32;
        loop {
            self.scopes.clear();
            self.diagnostics.clear();
            self.reset_modified();
            let pass_modified = resolve.run(self, root)?;
            self.garbage_collect()?;

            rounds += 1;
            if options.dump_iterations {
                self.dump_state(rounds);
            }

            if !pass_modified && !self.modified() {
                break;
            }
            if rounds >= options.max_resolver_rounds {
                return Err(InternalError::ResolverDidNotConverge { rounds }.into());
            }
        }

        if self.diagnostics.has_errors() {
            return Ok(());
        }

        validate_post.run(self, root)?;
        if self.diagnostics.has_errors() {
            return Ok(());
        }

        transform.run(self, root)?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Typed accessors
    // -----------------------------------------------------------------

    #[must_use]
    pub fn declaration(&self, id: NodeId) -> &Declaration {
        match &self.node(id).kind {
            NodeKind::Declaration(d) => d,
            _ => panic!("node {id} is not a Declaration"),
        }
    }

    pub fn declaration_mut(&mut self, id: NodeId) -> &mut Declaration {
        match &mut self.node_mut(id).kind {
            NodeKind::Declaration(d) => d,
            _ => panic!("node {id} is not a Declaration"),
        }
    }

    #[must_use]
    pub fn unqualified_type(&self, id: NodeId) -> &UnqualifiedType {
        match &self.node(id).kind {
            NodeKind::UnqualifiedType(t) => t,
            _ => panic!("node {id} is not an UnqualifiedType"),
        }
    }
}
