//! Brace protection for system names and acronyms in titles, so BibTeX
//! styles that re-case titles keep them intact.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Names that must keep their casing, in canonical form.
static SPECIAL_NAMES: &[&str] = &[
    "ACID", "API", "BFT", "CPU", "CXL", "DAG", "DNN", "DNS", "DPDK", "DRAM", "eBPF", "FPGA",
    "gRPC", "GPU", "Hadoop", "HPC", "HTM", "HTTP", "IoT", "IP", "JIT", "JVM", "KV", "Linux",
    "LLVM", "LSM", "MapReduce", "ML", "MPI", "NIC", "NoSQL", "NVM", "NVMe", "OLAP", "OLTP", "OS",
    "P4", "Paxos", "QUIC", "Raft", "RDMA", "RPC", "SGX", "SmartNIC", "Spark", "SQL", "SSD",
    "TCP", "TLS", "TPU", "UDP", "VM", "WAN", "WebAssembly", "x86", "ZooKeeper",
];

static BY_LOWERCASE: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    SPECIAL_NAMES
        .iter()
        .map(|name| (name.to_lowercase(), *name))
        .collect()
});

/// Canonical casing of `word` if it is a special name.
pub fn canonical_name(word: &str) -> Option<&'static str> {
    BY_LOWERCASE.get(&word.to_lowercase()).copied()
}

/// Whether the whole of `s` is one balanced `{...}` group.
fn is_brace_wrapped(s: &str) -> bool {
    if !(s.starts_with('{') && s.ends_with('}')) || s.len() < 2 {
        return false;
    }
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 && i + 1 < s.len() {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn protect(text: &str) -> String {
    if is_brace_wrapped(text) {
        text.to_string()
    } else {
        format!("{{{}}}", text)
    }
}

/// Wrap a single whitespace-delimited word if its core is a special name or a
/// `/`/`-` compound made only of special names.
fn wrap_word(word: &str) -> String {
    let Some(start) = word.find(|c: char| c.is_alphanumeric() || c == '{') else {
        return word.to_string();
    };
    let end = word
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_alphanumeric() || *c == '}')
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(word.len());
    if end <= start {
        return word.to_string();
    }

    let (lead, core, trail) = (&word[..start], &word[start..end], &word[end..]);
    if core.contains(['{', '}', '\\']) {
        return word.to_string();
    }

    if let Some(name) = canonical_name(core) {
        return format!("{lead}{{{name}}}{trail}");
    }

    if let Some(sep) = core.chars().find(|c| *c == '/' || *c == '-') {
        let parts: Option<Vec<&str>> = core.split(sep).map(canonical_name).collect();
        if let Some(parts) = parts
            && parts.len() > 1
        {
            let joined = parts.join(&sep.to_string());
            return format!("{lead}{{{joined}}}{trail}");
        }
    }

    word.to_string()
}

/// Protect the leading system name (`Name: ...`) and every special name in a
/// title. Whitespace runs collapse to single spaces; the result is stable
/// under repeated application.
pub fn format_title(title: &str) -> String {
    let words: Vec<&str> = title.split_whitespace().collect();
    let Some(first) = words.first() else {
        return String::new();
    };

    let mut out = Vec::with_capacity(words.len());
    let mut rest = &words[..];
    if let Some(name) = first.strip_suffix(':')
        && !name.is_empty()
    {
        out.push(format!("{}:", protect(name)));
        rest = &words[1..];
    }
    out.extend(rest.iter().map(|w| wrap_word(w)));
    out.join(" ")
}
