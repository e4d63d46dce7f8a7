//! Relative-to-absolute URL resolution.
//!
//! Malformed input is tolerated everywhere: missing components are simply
//! left out of the reassembled string.

#[derive(Debug, Default, PartialEq, Eq)]
struct UrlParts<'a> {
    scheme: Option<&'a str>,
    user: Option<&'a str>,
    password: Option<&'a str>,
    host: Option<&'a str>,
    port: Option<&'a str>,
    path: &'a str,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

impl<'a> UrlParts<'a> {
    fn parse(url: &'a str) -> Self {
        let mut parts = UrlParts::default();
        let mut rest = url;

        if let Some(hash) = rest.find('#') {
            parts.fragment = Some(&rest[hash + 1..]);
            rest = &rest[..hash];
        }
        if let Some(question) = rest.find('?') {
            parts.query = Some(&rest[question + 1..]);
            rest = &rest[..question];
        }

        if let Some(colon) = rest.find(':') {
            let candidate = &rest[..colon];
            if is_scheme(candidate) {
                parts.scheme = Some(candidate);
                rest = &rest[colon + 1..];
            }
        }

        if let Some(after) = rest.strip_prefix("//") {
            let end = after.find('/').unwrap_or(after.len());
            parts.set_authority(&after[..end]);
            rest = &after[end..];
        }

        parts.path = rest;
        parts
    }

    fn set_authority(&mut self, authority: &'a str) {
        let host_port = match authority.rfind('@') {
            Some(at) => {
                let userinfo = &authority[..at];
                match userinfo.split_once(':') {
                    Some((user, password)) => {
                        self.user = Some(user);
                        self.password = Some(password);
                    }
                    None => self.user = Some(userinfo),
                }
                &authority[at + 1..]
            }
            None => authority,
        };

        // Bracketed IPv6 literals carry colons of their own.
        let port_colon = match host_port.rfind(']') {
            Some(bracket) => host_port[bracket..].find(':').map(|c| bracket + c),
            None => host_port.rfind(':'),
        };
        match port_colon {
            Some(colon) => {
                self.host = Some(&host_port[..colon]);
                self.port = Some(&host_port[colon + 1..]);
            }
            None => self.host = Some(host_port),
        }
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Combines `relative` with `base` into an absolute URL.
///
/// Only the path of `relative` is merged; its query and fragment replace the
/// base's when present, otherwise the base's are kept.
pub fn resolve(relative: &str, base: &str) -> String {
    if relative.is_empty() {
        return base.to_string();
    }
    if relative.starts_with('#') || relative.starts_with('?') {
        let end = base.find(['?', '#']).unwrap_or(base.len());
        return format!("{}{}", &base[..end], relative);
    }

    let base_parts = UrlParts::parse(base);

    if relative.starts_with("//") {
        return match base_parts.scheme {
            Some(scheme) => format!("{}:{}", scheme, relative),
            None => relative.to_string(),
        };
    }

    let rel = UrlParts::parse(relative);
    if rel.scheme.is_some() {
        return relative.to_string();
    }

    let merged = if rel.path.starts_with('/') {
        rel.path.to_string()
    } else {
        let base_path = if base_parts.path.is_empty() && base_parts.host.is_some() {
            "/"
        } else {
            base_parts.path
        };
        let dir_end = base_path.rfind('/').map(|i| i + 1).unwrap_or(0);
        format!("{}{}", &base_path[..dir_end], rel.path)
    };
    let path = normalize_path(merged);

    let mut out = String::with_capacity(base.len() + relative.len());
    if let Some(scheme) = base_parts.scheme {
        out.push_str(scheme);
        out.push(':');
    }
    if let Some(host) = base_parts.host {
        out.push_str("//");
        if let Some(user) = base_parts.user {
            out.push_str(user);
            if let Some(password) = base_parts.password {
                out.push(':');
                out.push_str(password);
            }
            out.push('@');
        }
        out.push_str(host);
        if let Some(port) = base_parts.port {
            out.push(':');
            out.push_str(port);
        }
    }
    out.push_str(&path);

    let has_own_suffix = rel.query.is_some() || rel.fragment.is_some();
    let (query, fragment) = if has_own_suffix {
        (rel.query, rel.fragment)
    } else {
        (base_parts.query, base_parts.fragment)
    };
    if let Some(query) = query {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// Resolves `url` against the document it was found in, then against the
/// base of the page it is copied into.
pub fn rebase(url: &str, source: &str, page_base: &str) -> String {
    resolve(&resolve(url, source), page_base)
}

/// Collapses `/./` and `/segment/../` until neither occurs any more.
fn normalize_path(mut path: String) -> String {
    while let Some(pos) = path.find("/./") {
        path.replace_range(pos..pos + 3, "/");
    }

    loop {
        let mut collapsed = false;
        let mut search_from = 0;
        while let Some(offset) = path[search_from..].find("/../") {
            let pos = search_from + offset;
            if let Some(start) = path[..pos].rfind('/') {
                let segment = &path[start + 1..pos];
                if !segment.is_empty() && segment != "." && segment != ".." {
                    path.replace_range(start..pos + 4, "/");
                    collapsed = true;
                    break;
                }
            }
            search_from = pos + 1;
        }
        if !collapsed {
            return path;
        }
    }
}
