use crate::records::{category_of, DocumentRecord, FolderRecord, GENERAL_FOLDER};
use serde::Serialize;
use std::collections::BTreeMap;

/// File types the type facet always offers, whether or not any document has them.
pub const KNOWN_FILE_TYPES: &[&str] = &["pdf", "docx", "xlsx", "pptx", "jpg", "png", "zip"];

pub const GENERAL_FOLDER_LABEL: &str = "General";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionOption {
    pub extension: String,
    pub category: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderOption {
    pub id: String,
    pub label: String,
    pub count: usize,
}

/// Selectable values for the type and folder facets, with document counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FacetOptions {
    pub extensions: Vec<ExtensionOption>,
    pub folders: Vec<FolderOption>,
}

impl FacetOptions {
    pub fn collect(documents: &[DocumentRecord], folders: &[FolderRecord]) -> Self {
        let mut by_ext: BTreeMap<&str, usize> =
            KNOWN_FILE_TYPES.iter().map(|ext| (*ext, 0)).collect();
        let mut by_folder: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in documents {
            *by_ext.entry(doc.extension.as_str()).or_default() += 1;
            *by_folder.entry(doc.folder_id.as_str()).or_default() += 1;
        }

        let extensions = by_ext
            .into_iter()
            .map(|(ext, count)| ExtensionOption {
                extension: ext.to_string(),
                category: category_of(ext),
                count,
            })
            .collect();

        // General first, then known folders in source order, then ids that
        // documents reference but the folder source does not know about.
        let mut options = vec![FolderOption {
            id: GENERAL_FOLDER.to_string(),
            label: GENERAL_FOLDER_LABEL.to_string(),
            count: by_folder.remove(GENERAL_FOLDER).unwrap_or(0),
        }];
        for folder in folders.iter().filter(|f| f.id != GENERAL_FOLDER) {
            options.push(FolderOption {
                id: folder.id.clone(),
                label: folder.display_name.clone(),
                count: by_folder.remove(folder.id.as_str()).unwrap_or(0),
            });
        }
        options.extend(by_folder.into_iter().map(|(id, count)| FolderOption {
            id: id.to_string(),
            label: id.to_string(),
            count,
        }));

        Self {
            extensions,
            folders: options,
        }
    }
}

/// Display label for a folder id; unknown ids label themselves.
pub fn folder_label<'a>(folder_id: &'a str, folders: &'a [FolderRecord]) -> &'a str {
    if folder_id == GENERAL_FOLDER {
        return GENERAL_FOLDER_LABEL;
    }
    folders
        .iter()
        .find(|f| f.id == folder_id)
        .map(|f| f.display_name.as_str())
        .unwrap_or(folder_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_extensions_and_folders() {
        let docs = vec![
            DocumentRecord::new("1", "a.pdf").in_folder("f1"),
            DocumentRecord::new("2", "b.pdf"),
            DocumentRecord::new("3", "c.md").in_folder("ghost"),
        ];
        let folders = vec![FolderRecord::new("f1", "Taxes"), FolderRecord::new("f2", "Empty")];
        let options = FacetOptions::collect(&docs, &folders);

        let pdf = options.extensions.iter().find(|o| o.extension == "pdf").unwrap();
        assert_eq!(pdf.count, 2);
        assert_eq!(pdf.category, "document");
        let zip = options.extensions.iter().find(|o| o.extension == "zip").unwrap();
        assert_eq!(zip.count, 0);
        assert!(options.extensions.iter().any(|o| o.extension == "md"));

        let folder_view: Vec<(&str, &str, usize)> = options
            .folders
            .iter()
            .map(|f| (f.id.as_str(), f.label.as_str(), f.count))
            .collect();
        assert_eq!(
            folder_view,
            vec![
                ("general", "General", 1),
                ("f1", "Taxes", 1),
                ("f2", "Empty", 0),
                ("ghost", "ghost", 1),
            ]
        );
    }

    #[test]
    fn labels() {
        let folders = vec![FolderRecord::new("f1", "Taxes")];
        assert_eq!(folder_label("f1", &folders), "Taxes");
        assert_eq!(folder_label("general", &folders), "General");
        assert_eq!(folder_label("zzz", &folders), "zzz");
    }
}
