use uuid::Uuid;

use crate::users::dto::Link;

/// Links advertised on a single user resource.
pub fn create_user_links(base_url: &str, user_id: Uuid) -> Vec<Link> {
    let href = format!("{base_url}/users/{user_id}");
    vec![
        Link::new("self", href.clone(), "GET"),
        Link::new("update", href.clone(), "PUT"),
        Link::new("delete", href.clone(), "DELETE"),
        Link::new("upgrade", format!("{href}/upgrade"), "POST"),
    ]
}

/// Navigation links for a skip/limit page over `total` items.
pub fn generate_pagination_links(base_url: &str, skip: i64, limit: i64, total: i64) -> Vec<Link> {
    let page = |s: i64| format!("{base_url}/users/?skip={s}&limit={limit}");
    let limit = limit.max(1);
    let last_skip = if total > 0 {
        ((total - 1) / limit) * limit
    } else {
        0
    };

    let mut links = vec![
        Link::new("self", page(skip), "GET"),
        Link::new("first", page(0), "GET"),
        Link::new("last", page(last_skip), "GET"),
    ];
    let next_skip = skip.saturating_add(limit);
    if next_skip < total {
        links.push(Link::new("next", page(next_skip), "GET"));
    }
    if skip > 0 {
        links.push(Link::new("prev", page(skip.saturating_sub(limit).max(0)), "GET"));
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rels(links: &[Link]) -> Vec<&str> {
        links.iter().map(|l| l.rel.as_str()).collect()
    }

    #[test]
    fn user_links_point_at_resource() {
        let id = Uuid::new_v4();
        let links = create_user_links("http://api.test", id);
        assert_eq!(rels(&links), vec!["self", "update", "delete", "upgrade"]);
        assert_eq!(links[0].href, format!("http://api.test/users/{id}"));
        assert_eq!(links[2].method, "DELETE");
        assert_eq!(links[3].href, format!("http://api.test/users/{id}/upgrade"));
    }

    #[test]
    fn middle_page_has_next_and_prev() {
        let links = generate_pagination_links("http://api.test", 10, 10, 35);
        assert_eq!(rels(&links), vec!["self", "first", "last", "next", "prev"]);
        assert_eq!(links[2].href, "http://api.test/users/?skip=30&limit=10");
        assert_eq!(links[3].href, "http://api.test/users/?skip=20&limit=10");
        assert_eq!(links[4].href, "http://api.test/users/?skip=0&limit=10");
    }

    #[test]
    fn single_page_has_no_neighbours() {
        let links = generate_pagination_links("http://api.test", 0, 10, 3);
        assert_eq!(rels(&links), vec!["self", "first", "last"]);
        assert_eq!(links[2].href, "http://api.test/users/?skip=0&limit=10");
    }

    #[test]
    fn empty_collection_last_is_first() {
        let links = generate_pagination_links("http://api.test", 0, 5, 0);
        assert_eq!(links[1].href, links[2].href);
    }

    #[test]
    fn offsets_near_i64_max_do_not_overflow() {
        let links = generate_pagination_links("http://api.test", i64::MAX - 5, 10, 3);
        assert_eq!(rels(&links), vec!["self", "first", "last", "prev"]);
        assert_eq!(
            links[3].href,
            format!("http://api.test/users/?skip={}&limit=10", i64::MAX - 15)
        );
    }
}
