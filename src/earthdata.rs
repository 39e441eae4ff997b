use std::{
    error::Error,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;

use crate::{
    config::{non_empty_var, EarthdataConfig, LoginStrategy},
    error::PaceError,
    netrc::{Credentials, Netrc},
    remote::{Granule, PartialDownload, RemoteCatalog, SearchQuery},
    spatial::SpatialFilter,
    window::DateWindow,
};

const SEARCH_AFTER_HEADER: &str = "CMR-Search-After";
const DATA_REL_SUFFIX: &str = "/data#";

/// NASA's Common Metadata Repository for search, Earthdata Login for authenticated downloads.
#[derive(Debug, Clone)]
pub struct EarthdataCmr {
    client: Client,
    config: EarthdataConfig,
    token: String,
}

impl EarthdataCmr {
    /// Log in to Earthdata with the configured strategy. Done once, before any search.
    pub fn connect(config: EarthdataConfig) -> Result<Self, PaceError> {
        let client = Client::builder()
            .user_agent(concat!("pace_fetch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| PaceError::Remote(err.to_string()))?;

        Self::login(client, config)
    }

    fn login(client: Client, config: EarthdataConfig) -> Result<Self, PaceError> {
        let token = match resolve_login(&config)? {
            Login::Token(token) => token,
            Login::Basic(creds) => fetch_token(&client, &config.urs_url, &creds)?,
        };
        log::info!("Logged in to Earthdata ({} strategy)", config.strategy);

        Ok(EarthdataCmr {
            client,
            config,
            token,
        })
    }

    fn granule_search_url(&self) -> String {
        format!("{}/search/granules.json", self.config.cmr_url.trim_end_matches('/'))
    }

    fn fetch_link(&self, link: &str, dest_dir: &Path) -> Result<PathBuf, Box<dyn Error>> {
        let fname = file_name_from_url(link)
            .ok_or_else(|| PaceError::Remote(format!("no file name in url {}", link)))?;
        let local_path = dest_dir.join(fname);

        if already_downloaded(&local_path) {
            log::debug!("Skipping download for {:?}", local_path);
        } else {
            self.fetch_to(link, &local_path)?;
        }

        Ok(local_path)
    }

    fn fetch_to(&self, url: &str, local: &Path) -> Result<(), Box<dyn Error>> {
        let mut response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()?
            .error_for_status()?;

        let mut partial = local.as_os_str().to_owned();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        let written = write_body(&mut response, &partial).and_then(|bytes| {
            fs::rename(&partial, local)?;
            Ok(bytes)
        });

        match written {
            Ok(bytes) => {
                log::debug!("Wrote {} bytes to {:?}", bytes, local);
                Ok(())
            }
            Err(err) => {
                if let Err(rm_err) = fs::remove_file(&partial) {
                    log::debug!("Could not remove partial file {:?}: {}", partial, rm_err);
                }
                Err(err)
            }
        }
    }
}

impl RemoteCatalog for EarthdataCmr {
    fn search(&self, query: &SearchQuery) -> Result<Vec<Granule>, Box<dyn Error>> {
        let url = self.granule_search_url();
        let params = search_params(query, self.config.page_size);
        log::debug!("CMR search {} {:?}", url, params);

        let mut granules: Vec<Granule> = vec![];
        let mut search_after: Option<String> = None;
        loop {
            let mut request = self.client.get(&url).query(&params);
            if let Some(token) = &search_after {
                request = request.header(SEARCH_AFTER_HEADER, token);
            }

            let response = request.send()?.error_for_status()?;
            search_after = response
                .headers()
                .get(SEARCH_AFTER_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);

            let page: GranuleFeed = response.json()?;
            let page_len = page.feed.entry.len();
            granules.extend(page.feed.entry.into_iter().map(Granule::from));

            if page_len < self.config.page_size || search_after.is_none() {
                break;
            }
        }

        Ok(granules)
    }

    fn download(&self, granule: &Granule, dest_dir: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
        if granule.data_links.is_empty() {
            return Err(Box::new(PaceError::Remote(format!(
                "granule {} has no data links",
                granule
            ))));
        }

        let mut paths = vec![];
        for link in &granule.data_links {
            match self.fetch_link(link, dest_dir) {
                Ok(pth) => paths.push(pth),
                Err(err) if paths.is_empty() => return Err(err),
                Err(err) => {
                    return Err(Box::new(PartialDownload {
                        saved: paths,
                        reason: err.to_string(),
                    }))
                }
            }
        }

        Ok(paths)
    }
}

/*--------------------------------------------------------------------------------------------------
 *                                          Login
 *------------------------------------------------------------------------------------------------*/

#[derive(Debug, PartialEq, Eq)]
enum Login {
    Token(String),
    Basic(Credentials),
}

fn resolve_login(config: &EarthdataConfig) -> Result<Login, PaceError> {
    match config.strategy {
        LoginStrategy::Environment => login_from_env().ok_or_else(|| {
            PaceError::Login(
                "set EARTHDATA_TOKEN, or EARTHDATA_USERNAME and EARTHDATA_PASSWORD".into(),
            )
        }),
        LoginStrategy::Netrc => login_from_netrc(config),
        LoginStrategy::All => match login_from_env() {
            Some(login) => Ok(login),
            None => login_from_netrc(config),
        },
    }
}

fn login_from_env() -> Option<Login> {
    if let Some(token) = non_empty_var("EARTHDATA_TOKEN") {
        return Some(Login::Token(token));
    }

    let login = non_empty_var("EARTHDATA_USERNAME")?;
    let password = non_empty_var("EARTHDATA_PASSWORD")?;
    Some(Login::Basic(Credentials { login, password }))
}

fn login_from_netrc(config: &EarthdataConfig) -> Result<Login, PaceError> {
    let pth = config
        .netrc_file()
        .ok_or_else(|| PaceError::Login("cannot locate a netrc file, set NETRC".into()))?;

    let netrc = Netrc::from_file(&pth)
        .map_err(|err| PaceError::Login(format!("cannot read {:?}: {}", pth, err)))?;

    let host = config.urs_host();
    netrc
        .credentials_for(host)
        .cloned()
        .map(Login::Basic)
        .ok_or_else(|| PaceError::Login(format!("no entry for machine {} in {:?}", host, pth)))
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

fn fetch_token(client: &Client, urs_url: &str, creds: &Credentials) -> Result<String, PaceError> {
    let url = format!("{}/api/users/find_or_create_token", urs_url.trim_end_matches('/'));

    let response = client
        .post(&url)
        .basic_auth(&creds.login, Some(&creds.password))
        .send()
        .and_then(Response::error_for_status)
        .map_err(|err| PaceError::Login(err.to_string()))?;

    let token: TokenResponse = response
        .json()
        .map_err(|err| PaceError::Login(format!("unexpected token response: {}", err)))?;

    Ok(token.access_token)
}

/*--------------------------------------------------------------------------------------------------
 *                                          Search
 *------------------------------------------------------------------------------------------------*/

#[derive(Deserialize)]
struct GranuleFeed {
    feed: Feed,
}

#[derive(Deserialize)]
struct Feed {
    #[serde(default)]
    entry: Vec<GranuleEntry>,
}

#[derive(Deserialize)]
struct GranuleEntry {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Deserialize)]
struct Link {
    href: String,
    #[serde(default)]
    rel: String,
    #[serde(default)]
    inherited: bool,
}

impl From<GranuleEntry> for Granule {
    fn from(entry: GranuleEntry) -> Self {
        let mut data_links: Vec<String> = vec![];
        for link in entry.links {
            if link.inherited || !link.rel.ends_with(DATA_REL_SUFFIX) {
                continue;
            }
            if !link.href.starts_with("https://") && !link.href.starts_with("http://") {
                continue;
            }
            if !data_links.contains(&link.href) {
                data_links.push(link.href);
            }
        }

        Granule {
            id: entry.id,
            title: entry.title,
            data_links,
        }
    }
}

fn search_params(query: &SearchQuery, page_size: usize) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("short_name", query.short_name.to_owned()),
        ("temporal", temporal_range(&query.temporal)),
    ];

    match query.spatial {
        Some(SpatialFilter::BoundingBox(bbox)) => params.push((
            "bounding_box",
            format!("{},{},{},{}", bbox.west, bbox.south, bbox.east, bbox.north),
        )),
        Some(SpatialFilter::Circle { center, radius_km }) => params.push((
            "circle",
            format!("{},{},{}", center.lon, center.lat, radius_km * 1000.0),
        )),
        None => {}
    }

    params.push(("page_size", page_size.to_string()));
    params
}

/// Date-only bounds cover the whole day: start at midnight, end one second before the next.
fn temporal_range(window: &DateWindow) -> String {
    format!(
        "{},{}",
        expand_date(&window.start, "T00:00:00Z"),
        expand_date(&window.end, "T23:59:59Z")
    )
}

fn expand_date(value: &str, time_suffix: &str) -> String {
    if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        format!("{}{}", value, time_suffix)
    } else {
        value.to_owned()
    }
}

/*--------------------------------------------------------------------------------------------------
 *                                          Download
 *------------------------------------------------------------------------------------------------*/

fn file_name_from_url(url: &str) -> Option<&str> {
    let path = url.split(|c| c == '?' || c == '#').next()?;
    let fname = &path[path.rfind('/')? + 1..];
    if fname.is_empty() {
        None
    } else {
        Some(fname)
    }
}

fn already_downloaded(pth: &Path) -> bool {
    fs::metadata(pth).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

fn write_body(response: &mut Response, pth: &Path) -> Result<u64, Box<dyn Error>> {
    let mut f = File::create(pth)?;
    let bytes = response.copy_to(&mut f)?;
    f.flush()?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{BoundingBox, Point};
    use std::{
        io::Read,
        net::{TcpListener, TcpStream},
        thread::{self, JoinHandle},
    };

    const FEED: &str = r#"{
        "feed": {
            "entry": [
                {
                    "id": "G3000000001-OB_CLOUD",
                    "title": "PACE_OCI.20240301.L3m.MO.CHL.V2_0.chlor_a.4km.NRT.nc",
                    "links": [
                        {"rel": "http://esipfed.org/ns/fedsearch/1.1/data#",
                         "href": "https://obdaac-tea.earthdatacloud.nasa.gov/ob-cumulus-prod-public/PACE_OCI.20240301.L3m.MO.CHL.V2_0.chlor_a.4km.NRT.nc"},
                        {"rel": "http://esipfed.org/ns/fedsearch/1.1/s3#",
                         "href": "s3://ob-cumulus-prod-public/PACE_OCI.20240301.L3m.MO.CHL.V2_0.chlor_a.4km.NRT.nc"},
                        {"rel": "http://esipfed.org/ns/fedsearch/1.1/data#",
                         "href": "https://oceandata.sci.gsfc.nasa.gov/", "inherited": true},
                        {"rel": "http://esipfed.org/ns/fedsearch/1.1/metadata#",
                         "href": "https://cmr.earthdata.nasa.gov/search/concepts/G3000000001-OB_CLOUD.xml"}
                    ]
                },
                {"id": "G3000000002-OB_CLOUD"}
            ]
        }
    }"#;

    fn query(spatial: Option<SpatialFilter>) -> SearchQuery {
        SearchQuery {
            short_name: "PACE_OCI_L3M_CHL_NRT",
            temporal: DateWindow::new("2024-03-01", "2024-03-31"),
            spatial,
        }
    }

    #[test]
    fn feed_entries_keep_direct_data_links() {
        let feed: GranuleFeed = serde_json::from_str(FEED).unwrap();
        let granules: Vec<Granule> = feed.feed.entry.into_iter().map(Granule::from).collect();

        assert_eq!(granules.len(), 2);
        assert_eq!(granules[0].id, "G3000000001-OB_CLOUD");
        assert_eq!(granules[0].data_links.len(), 1);
        assert!(granules[0].data_links[0].ends_with("chlor_a.4km.NRT.nc"));
        assert!(granules[1].data_links.is_empty());
        assert_eq!(granules[1].to_string(), "G3000000002-OB_CLOUD");
    }

    #[test]
    fn search_params_for_bbox() {
        let bbox = BoundingBox::new(-80.0, 30.0, -60.5, 45.0).unwrap();
        let params = search_params(&query(Some(SpatialFilter::BoundingBox(bbox))), 2000);

        assert_eq!(
            params,
            vec![
                ("short_name", "PACE_OCI_L3M_CHL_NRT".to_owned()),
                ("temporal", "2024-03-01T00:00:00Z,2024-03-31T23:59:59Z".to_owned()),
                ("bounding_box", "-80,30,-60.5,45".to_owned()),
                ("page_size", "2000".to_owned()),
            ]
        );
    }

    #[test]
    fn search_params_for_point_use_lon_lat_and_meters() {
        let center = Point::new(44.5, -63.5).unwrap();
        let circle = SpatialFilter::circle(center, 50.0).unwrap();
        let params = search_params(&query(Some(circle)), 100);

        assert!(params.contains(&("circle", "-63.5,44.5,50000".to_owned())));
        assert!(!params.iter().any(|(k, _)| *k == "bounding_box"));
    }

    #[test]
    fn temporal_passes_through_full_timestamps() {
        let window = DateWindow::new("2024-03-01T06:00:00Z", "2024-03-02");
        assert_eq!(
            temporal_range(&window),
            "2024-03-01T06:00:00Z,2024-03-02T23:59:59Z"
        );
    }

    #[test]
    fn file_names_come_from_the_url_path() {
        assert_eq!(
            file_name_from_url("https://host/a/b/PACE_OCI.20240301.nc?token=x"),
            Some("PACE_OCI.20240301.nc")
        );
        assert_eq!(file_name_from_url("https://host/a/"), None);
        assert_eq!(file_name_from_url("no-slashes"), None);
    }

    #[test]
    fn netrc_login_resolves_urs_host() {
        let tmp = tempfile::tempdir().unwrap();
        let pth = tmp.path().join("netrc");
        fs::write(&pth, "machine urs.earthdata.nasa.gov login alice password s3cret\n").unwrap();

        let config = EarthdataConfig {
            netrc_path: Some(pth),
            ..EarthdataConfig::default()
        };

        assert_eq!(
            resolve_login(&config).unwrap(),
            Login::Basic(Credentials {
                login: "alice".into(),
                password: "s3cret".into()
            })
        );
    }

    #[test]
    fn netrc_login_without_entry_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let pth = tmp.path().join("netrc");
        fs::write(&pth, "machine example.com login bob password pw\n").unwrap();

        let config = EarthdataConfig {
            netrc_path: Some(pth),
            ..EarthdataConfig::default()
        };

        assert!(matches!(resolve_login(&config), Err(PaceError::Login(_))));
    }

    #[test]
    fn existing_files_count_as_downloaded() {
        let tmp = tempfile::tempdir().unwrap();
        let full = tmp.path().join("full.nc");
        let empty = tmp.path().join("empty.nc");
        fs::write(&full, b"data").unwrap();
        fs::write(&empty, b"").unwrap();

        assert!(already_downloaded(&full));
        assert!(!already_downloaded(&empty));
        assert!(!already_downloaded(&tmp.path().join("missing.nc")));
    }

    /*----------------------------------------------------------------------------------------------
     *                              Canned HTTP server
     *--------------------------------------------------------------------------------------------*/

    /// Answer one connection per canned response, returning the raw request heads it received.
    fn serve(responses: Vec<Vec<u8>>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let jh = thread::spawn(move || {
            let mut requests = vec![];
            for response in responses {
                let (mut stream, _) = listener.accept().unwrap();
                requests.push(read_request_head(&mut stream));
                stream.write_all(&response).unwrap();
                stream.flush().unwrap();
            }
            requests
        });

        (base, jh)
    }

    fn read_request_head(stream: &mut TcpStream) -> String {
        let mut buf = vec![];
        let mut chunk = [0_u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        String::from_utf8_lossy(&buf).to_lowercase()
    }

    fn http_response(status: &str, headers: &[(&str, &str)], body: &str) -> Vec<u8> {
        let mut out = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            status,
            body.len()
        );
        for (name, value) in headers {
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
        out.push_str("\r\n");
        out.push_str(body);
        out.into_bytes()
    }

    fn feed_of(ids: &[&str]) -> String {
        let entries: Vec<String> = ids
            .iter()
            .map(|id| {
                format!(
                    r#"{{"id": "{0}", "title": "{0}.nc", "links": [{{"rel": "http://esipfed.org/ns/fedsearch/1.1/data#", "href": "https://example.test/{0}.nc"}}]}}"#,
                    id
                )
            })
            .collect();
        format!(r#"{{"feed": {{"entry": [{}]}}}}"#, entries.join(","))
    }

    fn test_client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    fn cmr_at(base: &str, page_size: usize) -> EarthdataCmr {
        EarthdataCmr {
            client: test_client(),
            config: EarthdataConfig {
                cmr_url: base.to_owned(),
                urs_url: base.to_owned(),
                page_size,
                ..EarthdataConfig::default()
            },
            token: "tok-123".into(),
        }
    }

    fn granule_with_links(links: Vec<String>) -> Granule {
        Granule {
            id: "G1-OB_CLOUD".into(),
            title: "G1".into(),
            data_links: links,
        }
    }

    #[test]
    fn search_follows_search_after_pages() {
        let (base, server) = serve(vec![
            http_response(
                "200 OK",
                &[("Content-Type", "application/json"), ("CMR-Search-After", "page-two")],
                &feed_of(&["a", "b"]),
            ),
            http_response("200 OK", &[("Content-Type", "application/json")], &feed_of(&["c"])),
        ]);

        let granules = cmr_at(&base, 2).search(&query(None)).unwrap();
        let requests = server.join().unwrap();

        let ids: Vec<&str> = granules.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("get /search/granules.json?"));
        assert!(requests[0].contains("short_name=pace_oci_l3m_chl_nrt"));
        assert!(!requests[0].contains("cmr-search-after"));
        assert!(requests[1].contains("cmr-search-after: page-two"));
    }

    #[test]
    fn search_stops_on_a_short_page() {
        let (base, server) = serve(vec![http_response(
            "200 OK",
            &[("Content-Type", "application/json"), ("CMR-Search-After", "more")],
            &feed_of(&["only"]),
        )]);

        let granules = cmr_at(&base, 2).search(&query(None)).unwrap();

        assert_eq!(granules.len(), 1);
        assert_eq!(server.join().unwrap().len(), 1);
    }

    #[test]
    fn truncated_body_leaves_no_files() {
        let tmp = tempfile::tempdir().unwrap();
        let truncated =
            b"HTTP/1.1 200 OK\r\nContent-Length: 4096\r\nConnection: close\r\n\r\nnot nearly enough"
                .to_vec();
        let (base, server) = serve(vec![truncated]);

        let granule = granule_with_links(vec![format!("{}/data/broken.nc", base)]);
        let result = cmr_at(&base, 10).download(&granule, tmp.path());
        server.join().unwrap();

        assert!(result.is_err());
        assert!(!tmp.path().join("broken.nc").exists());
        assert!(!tmp.path().join("broken.nc.part").exists());
    }

    #[test]
    fn later_link_failure_keeps_earlier_files() {
        let tmp = tempfile::tempdir().unwrap();
        let (base, server) = serve(vec![
            http_response("200 OK", &[], "granule bytes"),
            http_response("404 Not Found", &[], "missing"),
        ]);

        let granule = granule_with_links(vec![
            format!("{}/data/first.nc", base),
            format!("{}/data/second.nc", base),
        ]);
        let err = cmr_at(&base, 10).download(&granule, tmp.path()).unwrap_err();
        let requests = server.join().unwrap();

        let partial = err.downcast_ref::<PartialDownload>().unwrap();
        assert_eq!(partial.saved, vec![tmp.path().join("first.nc")]);
        assert_eq!(fs::read_to_string(tmp.path().join("first.nc")).unwrap(), "granule bytes");
        assert!(!tmp.path().join("second.nc").exists());
        assert!(requests[0].contains("authorization: bearer tok-123"));
    }

    #[test]
    fn existing_granule_file_is_not_fetched_again() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("exists.nc"), b"already here").unwrap();

        // Nothing listens on the discard port, any request would fail.
        let granule = granule_with_links(vec!["http://127.0.0.1:9/data/exists.nc".into()]);
        let paths = cmr_at("http://127.0.0.1:9", 10)
            .download(&granule, tmp.path())
            .unwrap();

        assert_eq!(paths, vec![tmp.path().join("exists.nc")]);
        assert_eq!(fs::read(tmp.path().join("exists.nc")).unwrap(), b"already here");
    }

    #[test]
    fn netrc_login_exchanges_credentials_for_a_bearer_token() {
        let tmp = tempfile::tempdir().unwrap();
        let netrc = tmp.path().join("netrc");
        fs::write(&netrc, "machine 127.0.0.1 login alice password s3cret\n").unwrap();

        let (base, server) = serve(vec![
            http_response(
                "200 OK",
                &[("Content-Type", "application/json")],
                r#"{"access_token": "fresh-token", "token_type": "Bearer"}"#,
            ),
            http_response("200 OK", &[], "data"),
        ]);

        let config = EarthdataConfig {
            cmr_url: base.clone(),
            urs_url: base.clone(),
            strategy: LoginStrategy::Netrc,
            netrc_path: Some(netrc),
            ..EarthdataConfig::default()
        };
        let cmr = EarthdataCmr::login(test_client(), config).unwrap();
        cmr.download(
            &granule_with_links(vec![format!("{}/data/g.nc", base)]),
            tmp.path(),
        )
        .unwrap();
        let requests = server.join().unwrap();

        assert!(requests[0].starts_with("post /api/users/find_or_create_token"));
        assert!(requests[0].contains("authorization: basic "));
        assert!(requests[1].contains("authorization: bearer fresh-token"));
    }
}
