//! File path → logical module name, module documentation, and import
//! collection.

use std::path::{Component, Path};

use regex::Regex;

pub struct ModuleResolver {
    import_re: Regex,
    from_re: Regex,
    include_re: Regex,
}

impl ModuleResolver {
    pub fn new() -> Self {
        Self {
            import_re: Regex::new(r"^import\s+(.+)$").unwrap_or_else(|e| panic!("import regex: {e}")),
            from_re: Regex::new(r"^from\s+(\S+)\s+import\b").unwrap_or_else(|e| panic!("from regex: {e}")),
            include_re: Regex::new(r"^include\s+(.+)$").unwrap_or_else(|e| panic!("include regex: {e}")),
        }
    }

    /// Derive the logical module name for a source file.
    ///
    /// The name is the path relative to `root` with a leading `src`
    /// component and the `.nim` extension stripped, components joined with
    /// `/` regardless of platform separator.
    pub fn module_name(&self, file_path: &Path, root: &Path) -> String {
        let relative = file_path.strip_prefix(root).unwrap_or(file_path);
        let without_ext = relative.with_extension("");

        let mut parts: Vec<String> = without_ext
            .components()
            .filter_map(|c| match c {
                Component::Normal(os) => Some(os.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        if parts.first().map(String::as_str) == Some("src") {
            parts.remove(0);
        }

        parts.join("/")
    }

    /// The file-leading `##` doc block, joined with newlines.
    ///
    /// Leading blank lines are tolerated; the block ends at the first
    /// non-doc line.
    pub fn module_doc(&self, source: &str) -> String {
        let mut doc_lines = Vec::new();
        for line in source.lines() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() && doc_lines.is_empty() {
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix("##") {
                doc_lines.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
            } else {
                break;
            }
        }
        doc_lines.join("\n")
    }

    /// Referenced modules from `import`, `from … import`, and `include`
    /// lines. Informational only: no resolution against the filesystem.
    pub fn imports(&self, source: &str) -> Vec<String> {
        let mut refs = Vec::new();
        for line in source.lines() {
            let trimmed = line.trim();
            if let Some(caps) = self.from_re.captures(trimmed) {
                if let Some(m) = caps.get(1) {
                    refs.push(m.as_str().to_string());
                }
            } else if let Some(caps) = self
                .import_re
                .captures(trimmed)
                .or_else(|| self.include_re.captures(trimmed))
            {
                if let Some(m) = caps.get(1) {
                    for item in m.as_str().split(',') {
                        // `import x except y` and aliases `x as y` keep the
                        // module part only.
                        let module = item
                            .trim()
                            .split_whitespace()
                            .next()
                            .unwrap_or_default();
                        if !module.is_empty() {
                            refs.push(module.to_string());
                        }
                    }
                }
            }
        }
        refs
    }
}

impl Default for ModuleResolver {
    fn default() -> Self {
        Self::new()
    }
}
