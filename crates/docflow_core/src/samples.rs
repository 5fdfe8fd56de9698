/// A bundled sample document that can be submitted instead of an upload.
///
/// `path` is relative to the configured samples directory; the file is only
/// read when the sample is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleFile {
    pub name: &'static str,
    pub path: &'static str,
    pub description: &'static str,
    pub size_label: &'static str,
    pub pages: u32,
}

const SAMPLES: &[SampleFile] = &[
    SampleFile {
        name: "TTG-970.pdf",
        path: "TTG-970.pdf",
        description: "Scanned administrative decision with a document number and signatory",
        size_label: "412 KB",
        pages: 2,
    },
    SampleFile {
        name: "Administrative Order #001.pdf",
        path: "administrative-order-001.pdf",
        description: "Official administrative order regarding new policies",
        size_label: "245 KB",
        pages: 3,
    },
    SampleFile {
        name: "Meeting Minutes - Board.pdf",
        path: "meeting-minutes-board.pdf",
        description: "Board meeting minutes from quarterly review",
        size_label: "189 KB",
        pages: 5,
    },
    SampleFile {
        name: "Policy Document v2.1.pdf",
        path: "policy-document-v2.pdf",
        description: "Updated organizational policy document",
        size_label: "312 KB",
        pages: 8,
    },
    SampleFile {
        name: "Budget Report Q3.pdf",
        path: "budget-report-q3.pdf",
        description: "Third quarter financial budget report",
        size_label: "156 KB",
        pages: 4,
    },
    SampleFile {
        name: "Staff Memo - Updates.pdf",
        path: "staff-memo-updates.pdf",
        description: "Internal staff communication memo",
        size_label: "98 KB",
        pages: 2,
    },
    SampleFile {
        name: "Project Proposal Draft.pdf",
        path: "project-proposal-draft.pdf",
        description: "Draft proposal for new project initiative",
        size_label: "278 KB",
        pages: 6,
    },
];

pub fn sample_catalog() -> &'static [SampleFile] {
    SAMPLES
}

/// Exact, case-sensitive lookup by display name.
pub fn find_sample(name: &str) -> Option<&'static SampleFile> {
    SAMPLES.iter().find(|sample| sample.name == name)
}
