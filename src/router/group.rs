use crate::metadata::RouteDescriptor;
use std::collections::HashMap;
use std::sync::Arc;

/// Descriptors owned by one controller class, in discovery order.
#[derive(Debug, Clone)]
pub struct RouteGroup {
    pub class_name: String,
    pub routes: Vec<Arc<RouteDescriptor>>,
}

impl RouteGroup {
    /// Base path shared by the group, taken from its first descriptor.
    pub fn class_path(&self) -> &str {
        self.routes
            .first()
            .map(|route| route.class_path.as_str())
            .unwrap_or("/")
    }
}

/// Partitions descriptors by exact class name. Classes appear in the order
/// they were first seen, and each group keeps its descriptors in input order.
pub fn group_routes(descriptors: &[Arc<RouteDescriptor>]) -> Vec<RouteGroup> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<RouteGroup> = Vec::new();

    for descriptor in descriptors {
        let slot = *index
            .entry(descriptor.class_name.as_str())
            .or_insert_with(|| {
                groups.push(RouteGroup {
                    class_name: descriptor.class_name.clone(),
                    routes: Vec::new(),
                });
                groups.len() - 1
            });
        groups[slot].routes.push(Arc::clone(descriptor));
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(class: &str, action: &str) -> Arc<RouteDescriptor> {
        Arc::new(RouteDescriptor::new(class, "/", "GET", action, action))
    }

    #[test]
    fn empty_input_gives_no_groups() {
        assert!(group_routes(&[]).is_empty());
    }

    #[test]
    fn groups_keep_first_seen_order_and_lose_nothing() {
        let input = vec![
            route("Items", "/a"),
            route("Users", "/b"),
            route("Items", "/c"),
            route("items", "/d"),
            route("Users", "/e"),
        ];
        let groups = group_routes(&input);

        let names: Vec<_> = groups.iter().map(|g| g.class_name.as_str()).collect();
        assert_eq!(names, ["Items", "Users", "items"]);

        let paths: Vec<Vec<&str>> = groups
            .iter()
            .map(|g| g.routes.iter().map(|r| r.method_path.as_str()).collect())
            .collect();
        assert_eq!(paths, vec![vec!["/a", "/c"], vec!["/b", "/e"], vec!["/d"]]);

        let total: usize = groups.iter().map(|g| g.routes.len()).sum();
        assert_eq!(total, input.len());
        for descriptor in &input {
            let hits = groups
                .iter()
                .flat_map(|g| g.routes.iter())
                .filter(|r| Arc::ptr_eq(r, descriptor))
                .count();
            assert_eq!(hits, 1);
        }
    }
}
