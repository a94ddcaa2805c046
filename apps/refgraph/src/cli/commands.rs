//! # CLI Command Implementations

use refgraph::{Config, DirectoryStore};
use refgraph_core::{
    Condition, DiscoveredGraph, EntryKind, Evaluator, GraphRenderer, QuerySpec, RefgraphError,
    StorageEntry, StorageId, StorageIndex, StorageUri,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Maximum size of a condition file (1 MB).
const MAX_CONDITION_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// INDEX SETUP
// =============================================================================

/// Open the configured store and populate an index over it.
pub fn open_index(config: &Config) -> Result<StorageIndex, RefgraphError> {
    let root = config
        .store
        .clone()
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    let store = DirectoryStore::open(&root)?;
    let id = StorageId::new(root.display().to_string());
    StorageIndex::open(id, Arc::new(store), &config.index)
}

fn print_json(value: &serde_json::Value) -> Result<(), RefgraphError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| RefgraphError::Deserialization(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn entry_json(entry: &StorageEntry) -> serde_json::Value {
    serde_json::json!({
        "uri": entry.uri().to_string(),
        "kind": entry.kind(),
        "label": entry.label(),
        "valid": entry.is_valid(),
    })
}

fn print_entries(entries: &[Arc<StorageEntry>], json_mode: bool) -> Result<(), RefgraphError> {
    if json_mode {
        let list: Vec<_> = entries.iter().map(|e| entry_json(e)).collect();
        return print_json(&serde_json::Value::Array(list));
    }
    for entry in entries {
        println!("{}  {}", entry.uri(), entry.label());
    }
    println!("{} entries", entries.len());
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show entry counts per kind and validity.
pub fn cmd_status(index: &StorageIndex, json_mode: bool) -> Result<(), RefgraphError> {
    let mut counts: BTreeMap<EntryKind, (usize, usize)> = BTreeMap::new();
    for entry in index.entities() {
        let slot = counts.entry(entry.kind()).or_default();
        slot.0 += 1;
        if entry.is_valid() {
            slot.1 += 1;
        }
    }

    if json_mode {
        let kinds: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|(kind, (total, valid))| {
                (
                    kind.as_str().to_string(),
                    serde_json::json!({ "total": total, "valid": valid }),
                )
            })
            .collect();
        return print_json(&serde_json::json!({
            "store": index.id().as_str(),
            "entries": index.len(),
            "kinds": kinds,
        }));
    }

    println!("Store:   {}", index.id().as_str());
    println!("Entries: {}", index.len());
    for (kind, (total, valid)) in &counts {
        println!("  {:<10} {:>6} ({} loaded)", kind.as_str(), total, valid);
    }
    Ok(())
}

// =============================================================================
// ACQUIRE COMMAND
// =============================================================================

/// Load one entry and list its references.
pub fn cmd_acquire(index: &StorageIndex, json_mode: bool, uri: &str) -> Result<(), RefgraphError> {
    let uri = StorageUri::parse(uri)?;
    let entry = index
        .acquire(&uri)
        .into_entry()
        .ok_or_else(|| RefgraphError::load_failed(&uri, "acquisition failed"))?;
    let references = entry.uri_properties();

    if json_mode {
        let mut out = entry_json(&entry);
        out["references"] = references
            .iter()
            .map(|p| serde_json::json!({ "label": p.label(), "uri": p.uri.to_string() }))
            .collect();
        return print_json(&out);
    }

    println!("{} ({})", entry.label(), entry.kind());
    println!("  uri: {}", entry.uri());
    for property in &references {
        println!("  {} -> {}", property.label(), property.uri);
    }
    Ok(())
}

// =============================================================================
// RENDER COMMAND
// =============================================================================

/// Expand the graph around `uri` and print it.
pub fn cmd_render(
    index: &StorageIndex,
    config: &Config,
    json_mode: bool,
    uri: &str,
) -> Result<(), RefgraphError> {
    let uri = StorageUri::parse(uri)?;
    let seed = index
        .acquire(&uri)
        .into_entry()
        .ok_or_else(|| RefgraphError::load_failed(&uri, "acquisition failed"))?;
    let renderer = GraphRenderer::new(index, config.graph.clone())?;
    let mut graph = DiscoveredGraph::new();
    let stats = renderer.render(&mut graph, &seed);
    let snapshot = graph.snapshot();

    if json_mode {
        let value = serde_json::to_value(&snapshot)
            .map_err(|e| RefgraphError::Deserialization(e.to_string()))?;
        return print_json(&value);
    }

    println!(
        "{} nodes, {} edges in {} rounds",
        snapshot.nodes.len(),
        snapshot.edges.len(),
        stats.rounds
    );
    for node in &snapshot.nodes {
        let marker = if node.style.is_some() { "*" } else { " " };
        println!("{} {}  [{}]", marker, node.label, node.uri);
    }
    for edge in &snapshot.edges {
        println!("  {} -> {}  {} (x{})", edge.from, edge.to, edge.label, edge.weight);
    }
    Ok(())
}

// =============================================================================
// SEARCH COMMAND
// =============================================================================

/// Camel-hump search over the cached URIs.
pub fn cmd_search(index: &StorageIndex, json_mode: bool, query: &str) -> Result<(), RefgraphError> {
    let found = index.search(query)?;
    print_entries(&found, json_mode)
}

// =============================================================================
// QUERY COMMAND
// =============================================================================

/// Evaluate the condition in `condition_file` over the cached entries.
pub fn cmd_query(
    index: &StorageIndex,
    json_mode: bool,
    condition_file: &Path,
    type_name: Option<String>,
    schema: Option<String>,
) -> Result<(), RefgraphError> {
    let metadata = std::fs::metadata(condition_file)
        .map_err(|e| RefgraphError::Io(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > MAX_CONDITION_FILE_SIZE {
        return Err(RefgraphError::InvalidArgument(format!(
            "Condition file is {} bytes, at most {} allowed",
            metadata.len(),
            MAX_CONDITION_FILE_SIZE
        )));
    }
    let text = std::fs::read_to_string(condition_file)
        .map_err(|e| RefgraphError::Io(e.to_string()))?;
    let condition: Condition =
        serde_json::from_str(&text).map_err(|e| RefgraphError::Deserialization(e.to_string()))?;

    let spec = QuerySpec {
        type_name,
        schema,
        condition,
    };
    let found = Evaluator::new(index).query(&spec);
    print_entries(&found, json_mode)
}
