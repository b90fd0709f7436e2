use std::collections::{BTreeMap, HashMap};

use super::graph::{PaperDataset, PaperNode, UNKNOWN_LABEL};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupingMode {
    Field,
    FirstAuthor,
    FirstInstitution,
}

impl GroupingMode {
    pub const ALL: [Self; 3] = [Self::Field, Self::FirstAuthor, Self::FirstInstitution];

    pub fn label(self) -> &'static str {
        match self {
            Self::Field => "Field",
            Self::FirstAuthor => "First author",
            Self::FirstInstitution => "First institution",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::FirstAuthor => "author",
            Self::FirstInstitution => "institution",
        }
    }

    pub fn value_of(self, paper: &PaperNode) -> String {
        let value = match self {
            Self::Field => paper.field.trim(),
            Self::FirstAuthor => {
                let explicit = paper.first_author.trim();
                if explicit.is_empty() {
                    first_entry(&paper.authors)
                } else {
                    explicit
                }
            }
            Self::FirstInstitution => first_entry(&paper.institutions),
        };

        if value.is_empty() {
            UNKNOWN_LABEL.to_owned()
        } else {
            value.to_owned()
        }
    }
}

fn first_entry(list: &str) -> &str {
    list.split([',', ';'])
        .map(str::trim)
        .find(|entry| !entry.is_empty())
        .unwrap_or("")
}

/// Grouping key recipe: a primary mode optionally combined with a second axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupAxes {
    pub primary: GroupingMode,
    pub secondary: Option<GroupingMode>,
}

impl Default for GroupAxes {
    fn default() -> Self {
        Self {
            primary: GroupingMode::Field,
            secondary: None,
        }
    }
}

impl GroupAxes {
    pub fn key_of(&self, paper: &PaperNode) -> String {
        let primary = format!(
            "{}:{}",
            self.primary.prefix(),
            self.primary.value_of(paper)
        );
        match self.secondary.filter(|secondary| *secondary != self.primary) {
            Some(secondary) => format!(
                "{primary}|{}:{}",
                secondary.prefix(),
                secondary.value_of(paper)
            ),
            None => primary,
        }
    }

    fn label_of(&self, paper: &PaperNode) -> String {
        match self.secondary.filter(|secondary| *secondary != self.primary) {
            Some(secondary) => format!(
                "{} / {}",
                self.primary.value_of(paper),
                secondary.value_of(paper)
            ),
            None => self.primary.value_of(paper),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AggregateGroup {
    pub key: String,
    pub label: String,
    pub member_ids: Vec<String>,
    pub member_count: usize,
    pub citation_sum: u64,
    pub earliest_year: i32,
    pub lane: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AggregateEdge {
    pub source: String,
    pub target: String,
    pub weight: f32,
}

/// Collapses papers into groups. An inter-group edge weighs the number of
/// paper citations between the two groups, whatever those citations weigh.
/// Output order is sorted by key so repeated calls agree.
pub fn aggregate(
    dataset: &PaperDataset,
    axes: GroupAxes,
) -> (Vec<AggregateGroup>, Vec<AggregateEdge>) {
    let mut groups: BTreeMap<String, AggregateGroup> = BTreeMap::new();
    let mut field_counts: HashMap<String, HashMap<usize, usize>> = HashMap::new();
    let mut group_of_paper: HashMap<&str, String> = HashMap::with_capacity(dataset.papers.len());

    for paper in &dataset.papers {
        let key = axes.key_of(paper);
        let group = groups
            .entry(key.clone())
            .or_insert_with(|| AggregateGroup {
                key: key.clone(),
                label: axes.label_of(paper),
                member_ids: Vec::new(),
                member_count: 0,
                citation_sum: 0,
                earliest_year: paper.year,
                lane: 0,
            });
        group.member_ids.push(paper.id.clone());
        group.member_count += 1;
        group.citation_sum = group.citation_sum.saturating_add(paper.citations);
        group.earliest_year = group.earliest_year.min(paper.year);

        *field_counts
            .entry(key.clone())
            .or_default()
            .entry(paper.lane)
            .or_default() += 1;
        group_of_paper.insert(paper.id.as_str(), key);
    }

    let secondary_lanes = axes.secondary.map(|_| {
        let mut values = groups
            .values()
            .map(|group| secondary_value(&group.key))
            .collect::<Vec<_>>();
        values.sort();
        values.dedup();
        values
    });

    for group in groups.values_mut() {
        group.lane = match &secondary_lanes {
            Some(values) => values
                .binary_search(&secondary_value(&group.key))
                .unwrap_or(0),
            None => field_counts
                .get(&group.key)
                .and_then(|counts| {
                    counts
                        .iter()
                        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                        .map(|(lane, _)| *lane)
                })
                .unwrap_or(0),
        };
    }

    let mut weights: BTreeMap<(String, String), f32> = BTreeMap::new();
    for edge in &dataset.edges {
        let (Some(source), Some(target)) = (
            group_of_paper.get(edge.source.as_str()),
            group_of_paper.get(edge.target.as_str()),
        ) else {
            continue;
        };
        if source == target {
            continue;
        }
        *weights
            .entry((source.clone(), target.clone()))
            .or_default() += 1.0;
    }

    let edges = weights
        .into_iter()
        .map(|((source, target), weight)| AggregateEdge {
            source,
            target,
            weight,
        })
        .collect();

    (groups.into_values().collect(), edges)
}

fn secondary_value(key: &str) -> String {
    key.split_once('|')
        .map(|(_, secondary)| secondary.to_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::papers::{PaperEdge, test_paper};

    fn dataset() -> PaperDataset {
        let mut a = test_paper("a", "NLP", 2010, 5);
        a.first_author = "Ada".to_owned();
        a.institutions = "MIT; Stanford".to_owned();
        let mut b = test_paper("b", "NLP", 2004, 7);
        b.authors = "Grace, Alan".to_owned();
        let mut c = test_paper("c", "Vision", 2012, 1);
        c.first_author = "Ada".to_owned();
        let d = test_paper("d", "Vision", 2015, 0);

        let edge = |source: &str, target: &str| PaperEdge {
            source: source.to_owned(),
            target: target.to_owned(),
            weight: 1.0,
        };

        PaperDataset::new(
            vec![a, b, c, d],
            vec![edge("a", "c"), edge("b", "c"), edge("b", "d"), edge("a", "b")],
        )
    }

    #[test]
    fn field_groups_sum_members() {
        let (groups, edges) = aggregate(&dataset(), GroupAxes::default());

        assert_eq!(groups.len(), 2);
        let nlp = &groups[0];
        assert_eq!(nlp.key, "field:NLP");
        assert_eq!(nlp.member_count, 2);
        assert_eq!(nlp.citation_sum, 12);
        assert_eq!(nlp.earliest_year, 2004);
        assert_eq!(nlp.lane, 0);
        assert_eq!(groups[1].lane, 1);

        // a->b is intra-group and dropped; the other three fold into one edge.
        assert_eq!(
            edges,
            vec![AggregateEdge {
                source: "field:NLP".to_owned(),
                target: "field:Vision".to_owned(),
                weight: 3.0,
            }]
        );
    }

    #[test]
    fn author_grouping_falls_back_to_author_list() {
        let axes = GroupAxes {
            primary: GroupingMode::FirstAuthor,
            secondary: None,
        };
        let (groups, _) = aggregate(&dataset(), axes);
        let keys = groups.iter().map(|group| group.key.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["author:Ada", "author:Grace", "author:Unknown"]);
    }

    #[test]
    fn institution_grouping_takes_first_entry() {
        let axes = GroupAxes {
            primary: GroupingMode::FirstInstitution,
            secondary: None,
        };
        let (groups, _) = aggregate(&dataset(), axes);
        assert!(groups.iter().any(|group| group.key == "institution:MIT"));
    }

    #[test]
    fn secondary_axis_combines_keys_and_sets_lanes() {
        let axes = GroupAxes {
            primary: GroupingMode::FirstAuthor,
            secondary: Some(GroupingMode::Field),
        };
        let (groups, _) = aggregate(&dataset(), axes);
        let ada_vision = groups
            .iter()
            .find(|group| group.key == "author:Ada|field:Vision")
            .expect("combined group");
        assert_eq!(ada_vision.label, "Ada / Vision");
        assert_eq!(ada_vision.lane, 1);
    }

    #[test]
    fn keys_are_stable_across_recomputation() {
        let first = aggregate(&dataset(), GroupAxes::default());
        let second = aggregate(&dataset(), GroupAxes::default());
        assert_eq!(first, second);
    }

    #[test]
    fn group_edges_count_citations_not_their_weights() {
        let heavy = |source: &str, target: &str, weight: f32| PaperEdge {
            source: source.to_owned(),
            target: target.to_owned(),
            weight,
        };
        let dataset = PaperDataset::new(
            vec![
                test_paper("a", "NLP", 2010, 5),
                test_paper("b", "NLP", 2004, 7),
                test_paper("c", "Vision", 2012, 1),
            ],
            vec![heavy("a", "c", 2.5), heavy("b", "c", 4.0)],
        );
        let (_, edges) = aggregate(&dataset, GroupAxes::default());
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].weight, 2.0);
    }
}
