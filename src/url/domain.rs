use url::{Host, Url};

/// Returns the site key of a URL: the last two labels of a domain name, or
/// the full address for IP hosts
///
/// hh.ru serves vacancies from regional subdomains (`spb.hh.ru`,
/// `novosibirsk.hh.ru`), which all share the key `hh.ru`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use vacancy_harvest::url::site_key;
///
/// let url = Url::parse("https://spb.hh.ru/vacancy/1").unwrap();
/// assert_eq!(site_key(&url), Some("hh.ru".to_string()));
/// ```
pub fn site_key(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) => {
            let domain = domain.to_lowercase();
            let labels: Vec<&str> = domain.split('.').filter(|l| !l.is_empty()).collect();
            let start = labels.len().saturating_sub(2);
            Some(labels[start..].join("."))
        }
        Host::Ipv4(addr) => Some(format!("{}:{}", addr, url.port_or_known_default()?)),
        Host::Ipv6(addr) => Some(format!("[{}]:{}", addr, url.port_or_known_default()?)),
    }
}

/// Checks whether two URLs belong to the same site
pub fn same_site(a: &Url, b: &Url) -> bool {
    match (site_key(a), site_key(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
