use async_trait::async_trait;
use corerpc_endpoint::Error;
use corerpc_sd::{DiscoveryClient, Service, ERR_NO_KEY, ERR_NO_VALUE};
use etcd_client::{
    Certificate, Client as EtcdClient, ConnectOptions, GetOptions, Identity, TlsOptions,
    WatchOptions,
};
use tokio::sync::{mpsc::UnboundedSender, Mutex};

use crate::client_options::ClientOptions;

/// A [`DiscoveryClient`] backed by a real etcd v3 cluster. Grounded on
/// `etcdv3.client`: a lazily-initialized lease for `register`, a
/// `watch` loop that just pings a signal channel (callers re-fetch
/// with `get_entries` themselves) on any key change under the watched
/// prefix, and clamped keep-alives to match the TTL the service was
/// registered with.
pub struct Client {
    inner: EtcdClient,
    lease_id: Mutex<Option<i64>>,
}

/// Connects to the given etcd endpoints, applying TLS and auth from
/// `options` if set.
pub async fn connect(endpoints: Vec<String>, options: ClientOptions) -> Result<Client, Error> {
    let mut connect_options = ConnectOptions::new()
        .with_connect_timeout(options.dial_timeout())
        .with_keep_alive(options.dial_keep_alive(), options.dial_keep_alive());

    if options.tls_enabled() {
        let cert = std::fs::read_to_string(options.cert.as_ref().unwrap())?;
        let key = std::fs::read_to_string(options.key.as_ref().unwrap())?;
        let mut tls = TlsOptions::new().identity(Identity::from_pem(cert, key));
        if let Some(ca) = &options.ca_cert {
            let ca_pem = std::fs::read_to_string(ca)?;
            tls = tls.ca_certificate(Certificate::from_pem(ca_pem));
        }
        connect_options = connect_options.with_tls(tls);
    }

    if let (Some(user), Some(pass)) = (&options.username, &options.password) {
        connect_options = connect_options.with_user(user.clone(), pass.clone());
    }

    let inner = EtcdClient::connect(endpoints, Some(connect_options))
        .await
        .map_err(|e| -> Error { Box::new(e) })?;

    Ok(Client {
        inner,
        lease_id: Mutex::new(None),
    })
}

#[async_trait]
impl DiscoveryClient for Client {
    async fn get_entries(&self, prefix: &str) -> Result<Vec<String>, Error> {
        let mut kv = self.inner.kv_client();
        let resp = kv
            .get(prefix, Some(GetOptions::new().with_prefix()))
            .await
            .map_err(|e| -> Error { Box::new(e) })?;
        Ok(resp
            .kvs()
            .iter()
            .filter_map(|kv| std::str::from_utf8(kv.value()).ok().map(str::to_string))
            .collect())
    }

    async fn watch_prefix(&self, prefix: &str, ch: UnboundedSender<()>) {
        let mut watch_client = self.inner.watch_client();
        let _ = ch.send(());
        let watcher = watch_client
            .watch(prefix, Some(WatchOptions::new().with_prefix()))
            .await;
        let mut stream = match watcher {
            Ok((_watcher, stream)) => stream,
            Err(err) => {
                tracing::warn!(%prefix, error = %err, "failed to start watch");
                return;
            }
        };
        while let Ok(Some(resp)) = stream.message().await {
            if resp.canceled() {
                return;
            }
            if ch.send(()).is_err() {
                return;
            }
        }
    }

    async fn register(&self, service: &Service) -> Result<(), Error> {
        if service.key.is_empty() {
            return Err(ERR_NO_KEY.into());
        }
        if service.value.is_empty() {
            return Err(ERR_NO_VALUE.into());
        }

        let ttl = service
            .ttl
            .unwrap_or_default()
            .ttl()
            .as_secs()
            .max(1) as i64;

        let mut lease_client = self.inner.lease_client();
        let grant = lease_client
            .grant(ttl, None)
            .await
            .map_err(|e| -> Error { Box::new(e) })?;
        let id = grant.id();

        let mut kv = self.inner.kv_client();
        kv.put(
            service.key.clone(),
            service.value.clone(),
            Some(etcd_client::PutOptions::new().with_lease(id)),
        )
        .await
        .map_err(|e| -> Error { Box::new(e) })?;

        let (_keeper, mut stream) = lease_client
            .keep_alive(id)
            .await
            .map_err(|e| -> Error { Box::new(e) })?;
        tokio::spawn(async move {
            while let Ok(Some(_resp)) = stream.message().await {
                // just drains keep-alive acknowledgements to keep the
                // lease alive; nothing else to do with them.
            }
        });

        *self.lease_id.lock().await = Some(id);
        Ok(())
    }

    async fn deregister(&self, service: &Service) -> Result<(), Error> {
        if service.key.is_empty() {
            return Err(ERR_NO_KEY.into());
        }
        let mut kv = self.inner.kv_client();
        kv.delete(service.key.clone(), None)
            .await
            .map_err(|e| -> Error { Box::new(e) })?;
        Ok(())
    }

    fn lease_id(&self) -> Option<i64> {
        self.lease_id.try_lock().ok().and_then(|g| *g)
    }
}
