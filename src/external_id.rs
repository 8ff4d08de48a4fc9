//! External-id expressions: `;`-joined sections of dotted paths walked
//! through the reference graph, e.g. `Account__r.Owner.Email`.

use itertools::Itertools;
use log::debug;
use similar::TextDiff;

use crate::{
    catalog::SchemaCatalog,
    config::EngineConfig,
    describe::{FieldDescriptor, ObjectDescriptor, ReferenceKind, Side},
    issues::{Issue, IssueKind, join_messages},
};

pub const SEGMENT_SEPARATOR: char = '.';
pub const ID_FIELD: &str = "Id";

/// Standard relationship names that always map to their `…Id` field.
const ID_SUFFIXED_RELATIONSHIPS: &[&str] = &["RecordType", "Profile"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Exact lookups; anything missing is reported.
    Validate,
    /// Best fuzzy match per side; adopts the match when both sides agree.
    Repair,
}

impl From<bool> for ResolveMode {
    fn from(repair: bool) -> Self {
        if repair {
            ResolveMode::Repair
        } else {
            ResolveMode::Validate
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub raw_name: String,
    /// Object the segment was resolved against; empty when never reached.
    pub object_name: String,
    pub resolved_field: Option<FieldDescriptor>,
    /// Name shown in the canonical expression.
    pub display_name: String,
    pub error: Option<Issue>,
    /// True for the trailing `Id` added after a terminal reference.
    pub implicit: bool,
}

impl Segment {
    fn unresolved(raw_name: &str, object_name: &str) -> Self {
        Self {
            raw_name: raw_name.to_string(),
            object_name: object_name.to_string(),
            resolved_field: None,
            display_name: raw_name.to_string(),
            error: None,
            implicit: false,
        }
    }

    pub fn is_reference(&self) -> bool {
        self.resolved_field
            .as_ref()
            .is_some_and(FieldDescriptor::is_reference)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub raw: String,
    pub segments: Vec<Segment>,
    /// Object whose describe is still outstanding.
    pub pending_describe: Option<String>,
}

impl Section {
    pub fn canonical_name(&self) -> String {
        self.segments
            .iter()
            .map(|segment| segment.display_name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.segments
            .iter()
            .filter_map(|segment| segment.error.as_ref())
            .filter(|issue| !issue.is_transient())
    }

    pub fn has_error(&self) -> bool {
        self.errors().next().is_some()
    }

    /// All segment errors, joined for display next to the section.
    pub fn error_message(&self) -> Option<String> {
        self.has_error().then(|| join_messages(self.errors()))
    }

    /// The last segment that resolved to a concrete field.
    pub fn terminal_field(&self) -> Option<&FieldDescriptor> {
        self.segments
            .iter()
            .rev()
            .find_map(|segment| segment.resolved_field.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalIdExpression {
    pub raw: String,
    pub object_name: String,
    pub separator: String,
    pub sections: Vec<Section>,
}

impl ExternalIdExpression {
    pub fn canonical(&self) -> String {
        self.sections
            .iter()
            .map(Section::canonical_name)
            .collect::<Vec<_>>()
            .join(&self.separator)
    }

    pub fn is_valid(&self) -> bool {
        self.sections.iter().all(|section| !section.has_error())
    }

    pub fn is_composite(&self) -> bool {
        self.sections.len() > 1
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.sections.iter().flat_map(Section::errors)
    }

    /// Objects that must be described before the expression can be checked.
    pub fn pending_describes(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter_map(|section| section.pending_describe.as_deref())
            .unique()
            .collect()
    }
}

pub fn resolve(
    expression: &str,
    catalog: &SchemaCatalog,
    object_name: &str,
    mode: ResolveMode,
    config: &EngineConfig,
) -> ExternalIdExpression {
    let separator = config.complex_field_separator.as_str();
    let resolver = SectionResolver {
        catalog,
        config,
        mode,
    };
    let sections = expression
        .split(separator)
        .map(str::trim)
        .filter(|section| !section.is_empty())
        .map(|section| resolver.resolve_section(section, object_name))
        .collect::<Vec<_>>();

    let resolved = ExternalIdExpression {
        raw: expression.to_string(),
        object_name: object_name.to_string(),
        separator: separator.to_string(),
        sections,
    };
    debug!(
        "Resolved external id '{}' on {} as '{}' (valid: {}, mode: {:?})",
        expression,
        object_name,
        resolved.canonical(),
        resolved.is_valid(),
        mode
    );
    resolved
}

struct SectionResolver<'a> {
    catalog: &'a SchemaCatalog,
    config: &'a EngineConfig,
    mode: ResolveMode,
}

/// Outcome of looking a single segment up on the current object.
struct SegmentMatch<'a> {
    field: Option<&'a FieldDescriptor>,
    error: Option<Issue>,
}

impl<'a> SectionResolver<'a> {
    fn resolve_section(&self, raw: &str, object_name: &str) -> Section {
        let raw_names: Vec<&str> = raw.split(SEGMENT_SEPARATOR).map(str::trim).collect();
        let mut section = Section {
            raw: raw.to_string(),
            segments: Vec::with_capacity(raw_names.len() + 1),
            pending_describe: None,
        };
        let mut current_object = object_name.to_string();
        let mut completed = false;

        for (index, raw_name) in raw_names.iter().enumerate() {
            let is_last = index + 1 == raw_names.len();
            let mut segment = Segment::unresolved(raw_name, &current_object);

            if raw_name.is_empty() {
                segment.error = Some(Issue::new(
                    IssueKind::ExternalIdSegmentMissing,
                    &current_object,
                    None,
                    format!("empty segment in '{raw}'"),
                ));
                section.segments.push(segment);
                break;
            }
            let object = match self.enter_object(&current_object, &mut section) {
                Ok(object) => object,
                Err(issue) => {
                    segment.error = Some(issue);
                    section.segments.push(segment);
                    break;
                }
            };

            let normalized = normalize_segment(raw_name, object);
            let found = match self.mode {
                ResolveMode::Validate => self.lookup_exact(object, &normalized),
                ResolveMode::Repair => self.lookup_fuzzy(object, &normalized),
            };
            segment.error = found.error.or_else(|| pending_issue(object));
            let Some(field) = found.field else {
                section.segments.push(segment);
                break;
            };

            segment.resolved_field = Some(field.clone());
            if !field.is_reference() {
                segment.display_name = field.name.clone();
                if !is_last {
                    segment.error = Some(Issue::new(
                        IssueKind::ExternalIdSegmentNotLookup,
                        &current_object,
                        Some(&field.name),
                        format!(
                            "field {} of {} is not a lookup or master-detail",
                            field.name, current_object
                        ),
                    ));
                    section.segments.push(segment);
                    break;
                }
                section.segments.push(segment);
                completed = true;
                break;
            }

            segment.display_name = field.relationship_name();
            let Some(next_object) = self.referenced_object(field) else {
                segment.error = Some(Issue::new(
                    IssueKind::ExternalIdSegmentMissing,
                    &current_object,
                    Some(&field.name),
                    format!(
                        "referenced object of {}.{} is missing in source and target metadata",
                        current_object, field.name
                    ),
                ));
                section.segments.push(segment);
                break;
            };
            section.segments.push(segment);
            current_object = next_object.to_string();

            if is_last {
                let id = self.implicit_id(&current_object, &mut section);
                section.segments.push(id);
                completed = true;
            }
        }

        if !completed {
            let consumed = section
                .segments
                .iter()
                .filter(|segment| !segment.implicit)
                .count();
            for raw_name in raw_names.iter().skip(consumed) {
                section.segments.push(Segment::unresolved(raw_name, ""));
            }
        }
        section
    }

    /// Checks the object a segment is looked up on; `Err` ends the walk.
    ///
    /// An object still undescribed on one side is recorded as pending and
    /// walked on the side that has it.
    fn enter_object(
        &self,
        object_name: &str,
        section: &mut Section,
    ) -> Result<&'a ObjectDescriptor, Issue> {
        let object = self.catalog.lookup(object_name);
        if object.is_unknown() {
            return Err(Issue::object_missing(object_name));
        }
        if !object.is_described() {
            section
                .pending_describe
                .get_or_insert_with(|| object_name.to_string());
            if !object.is_described_on(Side::Source) && !object.is_described_on(Side::Target) {
                return Err(Issue::not_described(object_name));
            }
        }
        Ok(object)
    }

    /// The trailing `Id` after a terminal reference, checked like any segment.
    fn implicit_id(&self, object_name: &str, section: &mut Section) -> Segment {
        let mut segment = Segment::unresolved(ID_FIELD, object_name);
        segment.implicit = true;
        match self.enter_object(object_name, section) {
            Ok(object) => {
                let found = self.lookup_exact(object, ID_FIELD);
                segment.resolved_field = found.field.cloned();
                segment.error = found.error.or_else(|| pending_issue(object));
            }
            Err(issue) => segment.error = Some(issue),
        }
        segment
    }

    fn referenced_object(&self, field: &'a FieldDescriptor) -> Option<&'a str> {
        match field.reference_kind(&self.config.polymorphic_ignore_list) {
            ReferenceKind::None => None,
            ReferenceKind::Simple(object) => Some(object),
            ReferenceKind::Polymorphic(targets) => targets
                .iter()
                .find(|candidate| self.catalog.contains(candidate))
                .or_else(|| targets.first())
                .map(String::as_str),
        }
    }

    /// Exact lookup on both sides. A side whose describe is pending raises
    /// no presence issue.
    fn lookup_exact(&self, object: &ObjectDescriptor, field_name: &str) -> SegmentMatch<'a> {
        let object_name = object.name.as_str();
        let source = self.catalog.view(Side::Source).field(object_name, field_name);
        let target = self.catalog.view(Side::Target).field(object_name, field_name);
        let field = match (source.is_unknown(), target.is_unknown()) {
            (false, _) => Some(source),
            (true, false) => Some(target),
            (true, true) => None,
        };
        let in_source = !source.is_unknown() || object.is_pending_on(Side::Source);
        let in_target = !target.is_unknown() || object.is_pending_on(Side::Target);
        let error = Issue::presence(object_name, Some(field_name), in_source, in_target).map(
            |mut issue| {
                if field.is_none() {
                    issue.kind = IssueKind::ExternalIdSegmentMissing;
                }
                issue
            },
        );
        SegmentMatch { field, error }
    }

    fn lookup_fuzzy(&self, object: &ObjectDescriptor, field_name: &str) -> SegmentMatch<'a> {
        let object_name = object.name.as_str();
        let threshold = self.config.fuzzy_match_threshold;
        let source_names = self.catalog.view(Side::Source).field_names(object_name);
        let target_names = self.catalog.view(Side::Target).field_names(object_name);
        let source_match = best_match(field_name, &source_names, threshold);
        let target_match = best_match(field_name, &target_names, threshold);

        let ambiguous = |candidates: &[&str], side: Side| SegmentMatch {
            field: None,
            error: Some(Issue::new(
                IssueKind::AmbiguousRepair,
                object_name,
                Some(field_name),
                format!(
                    "{} in {} metadata of {} matches {} equally well",
                    field_name,
                    side.label(),
                    object_name,
                    candidates.join(", ")
                ),
            )),
        };

        let chosen = match (&source_match, &target_match) {
            (FuzzyMatch::Ambiguous(candidates), _) => return ambiguous(candidates.as_slice(), Side::Source),
            (_, FuzzyMatch::Ambiguous(candidates)) => return ambiguous(candidates.as_slice(), Side::Target),
            (FuzzyMatch::Found(source), FuzzyMatch::Found(target)) if source != target => {
                return SegmentMatch {
                    field: None,
                    error: Some(Issue::new(
                        IssueKind::AmbiguousRepair,
                        object_name,
                        Some(field_name),
                        format!(
                            "{field_name} repairs to {source} in source but to {target} in target metadata of {object_name}"
                        ),
                    )),
                };
            }
            (FuzzyMatch::Found(name), _) | (_, FuzzyMatch::Found(name)) => *name,
            (FuzzyMatch::NoMatch, FuzzyMatch::NoMatch) => {
                return SegmentMatch {
                    field: None,
                    error: Some(Issue::new(
                        IssueKind::ExternalIdSegmentMissing,
                        object_name,
                        Some(field_name),
                        format!(
                            "no field of {object_name} resembles {field_name} in source or target metadata"
                        ),
                    )),
                };
            }
        };

        if chosen != field_name {
            debug!("Repaired external id segment {object_name}.{field_name} -> {chosen}");
        }
        let mut found = self.lookup_exact(object, chosen);
        if let Some(issue) = found.error.as_mut() {
            issue.message = format!("{} (repaired from {field_name})", issue.message);
        }
        found
    }
}

fn pending_issue(object: &ObjectDescriptor) -> Option<Issue> {
    (!object.is_described()).then(|| Issue::not_described(&object.name))
}

/// Maps relationship spellings to the field they traverse.
fn normalize_segment(raw: &str, object: &ObjectDescriptor) -> String {
    if ID_SUFFIXED_RELATIONSHIPS.contains(&raw) {
        return format!("{raw}{ID_FIELD}");
    }
    if let Some(base) = raw.strip_suffix("__r") {
        return format!("{base}__c");
    }
    if object.has_field(raw) {
        return raw.to_string();
    }
    let id_suffixed = format!("{raw}{ID_FIELD}");
    if object.field(&id_suffixed).is_reference() {
        return id_suffixed;
    }
    raw.to_string()
}

#[derive(Debug, Clone, PartialEq)]
enum FuzzyMatch<'a> {
    Found(&'a str),
    Ambiguous(Vec<&'a str>),
    NoMatch,
}

/// Highest similarity ratio among `candidates`, compared case-insensitively.
fn best_match<'a>(name: &str, candidates: &[&'a str], threshold: f32) -> FuzzyMatch<'a> {
    let wanted = name.to_lowercase();
    if let Some(exact) = candidates
        .iter()
        .find(|candidate| candidate.to_lowercase() == wanted)
    {
        return FuzzyMatch::Found(*exact);
    }

    let mut best_score = 0.0f32;
    let mut best: Vec<&'a str> = Vec::new();
    for &candidate in candidates {
        let score = TextDiff::from_chars(wanted.as_str(), candidate.to_lowercase().as_str()).ratio();
        if score < threshold {
            continue;
        }
        if (score - best_score).abs() <= f32::EPSILON {
            best.push(candidate);
        } else if score > best_score {
            best_score = score;
            best.clear();
            best.push(candidate);
        }
    }
    match best.len() {
        0 => FuzzyMatch::NoMatch,
        1 => FuzzyMatch::Found(best[0]),
        _ => FuzzyMatch::Ambiguous(best),
    }
}
