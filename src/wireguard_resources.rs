// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! WireGuard Kubernetes resource builders
//!
//! This module derives the managed children (`Secret`, `ConfigMap`, `Deployment`,
//! `Service`) of a `Wireguard` or `WireguardPeer` from its spec. Everything here is
//! pure apart from key minting, which goes through a [`KeyProvider`].
//!
//! Both resource kinds are first reduced to a [`Tunnel`], the kind-independent
//! description of one tunnel endpoint, and every builder works from that.
//!
//! The `*_drift` functions compare a live child against its desired form on the
//! fields this operator manages, and return the patched object when they differ.

use crate::config::OperatorConfig;
use crate::constants::{
    CONFIGMAP_KEY_UNBOUND, CONTAINER_NAME_UNBOUND, CONTAINER_NAME_WIREGUARD,
    DEFAULT_ALLOWED_IPS, DEFAULT_LISTEN_PORT, DEFAULT_PEER_DNS, LOCAL_NAMESERVER, MAX_REPLICAS,
    MIN_REPLICAS, PEER_REPLICAS, PEER_SERVICE_TYPE, SECRET_KEY_CONFIG, SECRET_KEY_PRIVATE_KEY,
    SECRET_KEY_PUBLIC_KEY, SECRET_KEY_SERVER_CONFIG, SECRET_KEY_SERVER_PRIVATE_KEY,
    SECRET_KEY_SERVER_PUBLIC_KEY, SYSCTL_IP_FORWARD, UNBOUND_CONFIG_MOUNT_PATH,
    VOLUME_UNBOUND_CONFIG, VOLUME_WIREGUARD_CONFIG, WIREGUARD_CAPABILITIES,
    WIREGUARD_CONFIG_FILENAME, WIREGUARD_CONFIG_MOUNT_PATH, WIREGUARD_PORT_NAME,
};
use crate::crd::{ExternalDns, Wireguard, WireguardPeer};
use crate::errors::{Error, Result};
use crate::keys::KeyProvider;
use crate::labels::{
    APP_NAME_WIREGUARD, COMPONENT_PEER, COMPONENT_SERVER, K8S_COMPONENT, K8S_INSTANCE,
    K8S_MANAGED_BY, K8S_NAME, K8S_PART_OF, K8S_VERSION, MANAGED_BY_WIREGUARD,
    MANAGED_BY_WIREGUARD_PEER, PART_OF_WIREGUARD_OPERATOR,
};
use crate::network::{firewall_rules, host_address, host_bounds, parse_cidr};
use crate::render::{
    render_peer_config, render_server_config, render_unbound_config, PeerConfig, ServerConfig,
};
use ipnet::Ipv4Net;
use k8s_openapi::api::{
    apps::v1::{Deployment, DeploymentSpec},
    core::v1::{
        Affinity, Capabilities, ConfigMap, ConfigMapVolumeSource, Container, ContainerPort,
        KeyToPath, PodDNSConfig, PodSecurityContext, PodSpec, PodTemplateSpec, Secret,
        SecretVolumeSource, SecurityContext, Service, ServicePort, ServiceSpec, Sysctl, Volume,
        VolumeMount,
    },
};
use k8s_openapi::apimachinery::pkg::{
    apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference},
    util::intstr::IntOrString,
};
use k8s_openapi::ByteString;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use tracing::debug;

/// Kind-independent description of one tunnel endpoint.
///
/// Building a `Tunnel` validates every address in the spec, so the builders
/// below cannot fail on malformed CIDRs.
#[derive(Debug, Clone)]
pub struct Tunnel {
    pub name: String,
    pub namespace: String,
    pub component: &'static str,
    pub managed_by: &'static str,
    pub owner_references: Vec<OwnerReference>,
    /// Replica count after clamping to the supported range
    pub replicas: i32,
    pub listen_port: i32,
    /// Address of this endpoint inside the tunnel (`/32`)
    pub address: Ipv4Net,
    /// Subnet the DNS sidecar accepts queries from
    pub subnet: Ipv4Net,
    /// Address routed to the built-in default peer (servers only)
    pub default_peer_address: Option<Ipv4Net>,
    pub firewall_rules: Vec<String>,
    pub external_dns: ExternalDns,
    pub sidecars: Vec<Container>,
    pub affinity: Option<Affinity>,
    /// Secret entry mounted as the interface configuration
    pub config_key: &'static str,
    pub service_type: String,
    pub service_annotations: BTreeMap<String, String>,
}

impl Tunnel {
    /// Describe the tunnel of a `Wireguard` server.
    ///
    /// The server takes the first host of `spec.address`; the last host goes
    /// to the default peer and keys the NAT and drop rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] for a malformed tunnel subnet or drop target.
    pub fn for_server(wg: &Wireguard) -> Result<Self> {
        let subnet = parse_cidr(&wg.spec.address)?;
        let bounds = host_bounds(&wg.spec.address)?;
        let firewall_rules = firewall_rules(bounds.last, &wg.spec.drop_connections_to)?;

        Ok(Self {
            name: wg.name_any(),
            namespace: wg.namespace().unwrap_or_default(),
            component: COMPONENT_SERVER,
            managed_by: MANAGED_BY_WIREGUARD,
            owner_references: build_owner_references(wg),
            replicas: wg.spec.replicas.clamp(MIN_REPLICAS, MAX_REPLICAS),
            listen_port: wg.spec.listen_port,
            address: bounds.first,
            subnet,
            default_peer_address: Some(bounds.last),
            firewall_rules,
            external_dns: wg.spec.external_dns.clone(),
            sidecars: wg.spec.sidecars.clone(),
            affinity: wg.spec.affinity.clone(),
            config_key: SECRET_KEY_SERVER_CONFIG,
            service_type: wg.spec.service_type.clone(),
            service_annotations: wg.spec.service_annotations.clone(),
        })
    }

    /// Describe the tunnel of a `WireguardPeer`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] for a malformed peer address or drop target.
    pub fn for_peer(peer: &WireguardPeer) -> Result<Self> {
        let address = host_address(&peer.spec.address)?;
        let firewall_rules = firewall_rules(address, &peer.spec.drop_connections_to)?;

        Ok(Self {
            name: peer.name_any(),
            namespace: peer.namespace().unwrap_or_default(),
            component: COMPONENT_PEER,
            managed_by: MANAGED_BY_WIREGUARD_PEER,
            owner_references: build_owner_references(peer),
            replicas: PEER_REPLICAS,
            listen_port: DEFAULT_LISTEN_PORT,
            address,
            subnet: address,
            default_peer_address: None,
            firewall_rules,
            external_dns: peer.spec.external_dns.clone(),
            sidecars: peer.spec.sidecars.clone(),
            affinity: None,
            config_key: SECRET_KEY_CONFIG,
            service_type: PEER_SERVICE_TYPE.to_string(),
            service_annotations: BTreeMap::new(),
        })
    }
}

/// What a peer needs from its server to render its client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentInfo {
    pub public_key: String,
    pub endpoint: String,
    pub dns: String,
}

impl ParentInfo {
    /// Read the published key and endpoint of a server.
    ///
    /// Returns `None` until the server's status carries both.
    #[must_use]
    pub fn from_server(wg: &Wireguard) -> Option<Self> {
        let status = wg.status.as_ref()?;
        let public_key = status.public_key.clone().filter(|k| !k.is_empty())?;
        let endpoint = status.endpoint.clone().filter(|e| !e.is_empty())?;
        Some(Self {
            public_key,
            endpoint,
            dns: server_dns(wg),
        })
    }
}

/// DNS server a server advertises to its peers.
#[must_use]
pub fn server_dns(wg: &Wireguard) -> String {
    wg.spec
        .dns
        .as_ref()
        .map(|dns| dns.address.trim())
        .filter(|addr| !addr.is_empty())
        .unwrap_or(DEFAULT_PEER_DNS)
        .to_string()
}

// ============================================================================
// Labels and ownership
// ============================================================================

/// Labels selecting the pods of one tunnel. Stable across image upgrades.
#[must_use]
pub fn build_selector_labels(tunnel: &Tunnel) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(K8S_NAME.into(), APP_NAME_WIREGUARD.into());
    labels.insert(K8S_INSTANCE.into(), tunnel.name.clone());
    labels.insert(K8S_COMPONENT.into(), tunnel.component.into());
    labels
}

/// Full label set for child metadata, including the runtime version.
#[must_use]
pub fn build_labels(tunnel: &Tunnel, config: &OperatorConfig) -> BTreeMap<String, String> {
    let mut labels = build_selector_labels(tunnel);
    labels.insert(K8S_MANAGED_BY.into(), tunnel.managed_by.into());
    labels.insert(K8S_PART_OF.into(), PART_OF_WIREGUARD_OPERATOR.into());
    labels.insert(K8S_VERSION.into(), config.image_tag().into());
    labels
}

/// Controller owner reference pointing at `owner`, so deleting it cascades.
#[must_use]
pub fn build_owner_references<K>(owner: &K) -> Vec<OwnerReference>
where
    K: Resource<DynamicType = ()>,
{
    vec![OwnerReference {
        api_version: K::api_version(&()).to_string(),
        kind: K::kind(&()).to_string(),
        name: owner.meta().name.clone().unwrap_or_default(),
        uid: owner.meta().uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }]
}

fn build_metadata(tunnel: &Tunnel, config: &OperatorConfig) -> ObjectMeta {
    ObjectMeta {
        name: Some(tunnel.name.clone()),
        namespace: Some(tunnel.namespace.clone()),
        labels: Some(build_labels(tunnel, config)),
        owner_references: Some(tunnel.owner_references.clone()),
        ..Default::default()
    }
}

// ============================================================================
// Secret
// ============================================================================

/// Mint the key material stored in a new server Secret.
///
/// The default peer gets a generated key pair unless `peerPublicKey` is set,
/// in which case only that public key is recorded.
#[must_use]
pub fn server_key_material(wg: &Wireguard, keys: &dyn KeyProvider) -> BTreeMap<String, String> {
    let server = keys.generate();
    let mut material = BTreeMap::new();
    material.insert(SECRET_KEY_SERVER_PRIVATE_KEY.to_string(), server.private_key);
    material.insert(SECRET_KEY_SERVER_PUBLIC_KEY.to_string(), server.public_key);

    match preset_key(wg.spec.peer_public_key.as_deref()) {
        Some(public_key) => {
            material.insert(SECRET_KEY_PUBLIC_KEY.to_string(), public_key.to_string());
        }
        None => {
            let peer = keys.generate();
            material.insert(SECRET_KEY_PRIVATE_KEY.to_string(), peer.private_key);
            material.insert(SECRET_KEY_PUBLIC_KEY.to_string(), peer.public_key);
        }
    }
    material
}

/// Mint the key material stored in a new peer Secret.
#[must_use]
pub fn peer_key_material(peer: &WireguardPeer, keys: &dyn KeyProvider) -> BTreeMap<String, String> {
    let mut material = BTreeMap::new();
    match preset_key(peer.spec.public_key.as_deref()) {
        Some(public_key) => {
            material.insert(SECRET_KEY_PUBLIC_KEY.to_string(), public_key.to_string());
        }
        None => {
            let pair = keys.generate();
            material.insert(SECRET_KEY_PRIVATE_KEY.to_string(), pair.private_key);
            material.insert(SECRET_KEY_PUBLIC_KEY.to_string(), pair.public_key);
        }
    }
    material
}

/// Desired data of a server Secret, rendered from the keys it already holds.
///
/// Keys are carried over untouched. The key mode is whatever the Secret was
/// created with: a stored `private-key` means generated mode, and only then is
/// the default peer's client configuration rendered. In bring-your-own-key mode
/// the recorded public key follows `peerPublicKey`.
///
/// # Errors
///
/// Returns [`Error::MissingSecretKey`] when `stored` lacks the server key pair.
pub fn render_server_secret_data(
    wg: &Wireguard,
    tunnel: &Tunnel,
    stored: &BTreeMap<String, String>,
    endpoint: &str,
) -> Result<BTreeMap<String, String>> {
    let server_private = require_key(tunnel, stored, SECRET_KEY_SERVER_PRIVATE_KEY)?;
    let server_public = require_key(tunnel, stored, SECRET_KEY_SERVER_PUBLIC_KEY)?;
    let peer_private = stored.get(SECRET_KEY_PRIVATE_KEY);
    let peer_public = resolve_public_key(tunnel, stored, wg.spec.peer_public_key.as_deref())?;
    let peer_address = tunnel.default_peer_address.unwrap_or(tunnel.address);

    let mut data = BTreeMap::new();
    data.insert(SECRET_KEY_SERVER_PRIVATE_KEY.to_string(), server_private.clone());
    data.insert(SECRET_KEY_SERVER_PUBLIC_KEY.to_string(), server_public.clone());
    data.insert(SECRET_KEY_PUBLIC_KEY.to_string(), peer_public.clone());
    data.insert(
        SECRET_KEY_SERVER_CONFIG.to_string(),
        render_server_config(&ServerConfig {
            address: tunnel.address,
            listen_port: tunnel.listen_port,
            private_key: server_private,
            peer_public_key: &peer_public,
            peer_address,
            post_up: &tunnel.firewall_rules,
        }),
    );

    if let Some(peer_private) = peer_private {
        let dns = server_dns(wg);
        data.insert(SECRET_KEY_PRIVATE_KEY.to_string(), peer_private.clone());
        data.insert(
            SECRET_KEY_CONFIG.to_string(),
            render_peer_config(&PeerConfig {
                address: peer_address,
                private_key: peer_private,
                dns: &dns,
                server_public_key: server_public,
                endpoint,
                allowed_ips: DEFAULT_ALLOWED_IPS,
                post_up: &[],
            }),
        );
    }

    Ok(data)
}

/// Desired data of a peer Secret, rendered from the keys it already holds.
///
/// # Errors
///
/// Returns [`Error::MissingSecretKey`] when `stored` lacks the public key.
pub fn render_peer_secret_data(
    peer: &WireguardPeer,
    tunnel: &Tunnel,
    stored: &BTreeMap<String, String>,
    parent: &ParentInfo,
) -> Result<BTreeMap<String, String>> {
    let public_key = resolve_public_key(tunnel, stored, peer.spec.public_key.as_deref())?;

    let mut data = BTreeMap::new();
    data.insert(SECRET_KEY_PUBLIC_KEY.to_string(), public_key);

    if let Some(private_key) = stored.get(SECRET_KEY_PRIVATE_KEY) {
        data.insert(SECRET_KEY_PRIVATE_KEY.to_string(), private_key.clone());
        data.insert(
            SECRET_KEY_CONFIG.to_string(),
            render_peer_config(&PeerConfig {
                address: tunnel.address,
                private_key,
                dns: &parent.dns,
                server_public_key: &parent.public_key,
                endpoint: &parent.endpoint,
                allowed_ips: DEFAULT_ALLOWED_IPS,
                post_up: &tunnel.firewall_rules,
            }),
        );
    }

    Ok(data)
}

/// Describe a key-mode switch requested after the Secret was created.
///
/// The key mode is fixed at creation, so such a request is reported and ignored.
#[must_use]
pub fn key_mode_change(
    stored: &BTreeMap<String, String>,
    preset: Option<&str>,
) -> Option<&'static str> {
    let generated = stored.contains_key(SECRET_KEY_PRIVATE_KEY);
    match (generated, preset_key(preset).is_some()) {
        (true, true) => Some(
            "a public key was supplied after keys were generated; keeping the generated key pair",
        ),
        (false, false) => Some(
            "the supplied public key was removed; key generation stays disabled for the existing Secret",
        ),
        _ => None,
    }
}

/// Build a new server Secret: mint keys, then render configuration from them.
///
/// # Errors
///
/// Propagates rendering errors from [`render_server_secret_data`].
pub fn build_server_secret(
    wg: &Wireguard,
    tunnel: &Tunnel,
    config: &OperatorConfig,
    keys: &dyn KeyProvider,
    endpoint: &str,
) -> Result<Secret> {
    let material = server_key_material(wg, keys);
    let data = render_server_secret_data(wg, tunnel, &material, endpoint)?;
    Ok(build_secret(tunnel, config, &data))
}

/// Build a new peer Secret: mint keys, then render configuration from them.
///
/// # Errors
///
/// Propagates rendering errors from [`render_peer_secret_data`].
pub fn build_peer_secret(
    peer: &WireguardPeer,
    tunnel: &Tunnel,
    config: &OperatorConfig,
    keys: &dyn KeyProvider,
    parent: &ParentInfo,
) -> Result<Secret> {
    let material = peer_key_material(peer, keys);
    let data = render_peer_secret_data(peer, tunnel, &material, parent)?;
    Ok(build_secret(tunnel, config, &data))
}

/// Build a Secret holding `data` for `tunnel`.
#[must_use]
pub fn build_secret(
    tunnel: &Tunnel,
    config: &OperatorConfig,
    data: &BTreeMap<String, String>,
) -> Secret {
    debug!(
        name = %tunnel.name,
        namespace = %tunnel.namespace,
        entries = data.len(),
        "Building Secret"
    );

    Secret {
        metadata: build_metadata(tunnel, config),
        data: Some(to_byte_data(data)),
        type_: Some("Opaque".into()),
        ..Default::default()
    }
}

/// Decode Secret entries as UTF-8 text, merging `stringData` over `data`.
#[must_use]
pub fn secret_string_data(secret: &Secret) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = secret
        .data
        .iter()
        .flatten()
        .filter_map(|(k, v)| String::from_utf8(v.0.clone()).ok().map(|s| (k.clone(), s)))
        .collect();
    if let Some(string_data) = &secret.string_data {
        out.extend(string_data.clone());
    }
    out
}

fn to_byte_data(data: &BTreeMap<String, String>) -> BTreeMap<String, ByteString> {
    data.iter()
        .map(|(k, v)| (k.clone(), ByteString(v.clone().into_bytes())))
        .collect()
}

fn preset_key(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn require_key<'a>(
    tunnel: &Tunnel,
    stored: &'a BTreeMap<String, String>,
    key: &'static str,
) -> Result<&'a String> {
    stored.get(key).ok_or_else(|| Error::MissingSecretKey {
        namespace: tunnel.namespace.clone(),
        name: tunnel.name.clone(),
        key,
    })
}

// Generated mode keeps the stored public key; bring-your-own-key mode follows the spec.
fn resolve_public_key(
    tunnel: &Tunnel,
    stored: &BTreeMap<String, String>,
    preset: Option<&str>,
) -> Result<String> {
    let stored_public = require_key(tunnel, stored, SECRET_KEY_PUBLIC_KEY)?;
    if stored.contains_key(SECRET_KEY_PRIVATE_KEY) {
        return Ok(stored_public.clone());
    }
    Ok(preset_key(preset).map_or_else(|| stored_public.clone(), str::to_string))
}

// ============================================================================
// ConfigMap
// ============================================================================

/// Build the ConfigMap holding the DNS sidecar configuration.
#[must_use]
pub fn build_configmap(tunnel: &Tunnel, config: &OperatorConfig) -> ConfigMap {
    let mut data = BTreeMap::new();
    data.insert(
        CONFIGMAP_KEY_UNBOUND.to_string(),
        render_unbound_config(tunnel.address, tunnel.subnet),
    );

    ConfigMap {
        metadata: build_metadata(tunnel, config),
        data: Some(data),
        ..Default::default()
    }
}

// ============================================================================
// Deployment
// ============================================================================

/// Build the Deployment running the tunnel.
///
/// The tunnel container runs privileged with `NET_ADMIN` and `SYS_MODULE`;
/// dropping capabilities would prevent it from creating the interface. With
/// external DNS enabled the pod resolves only through the local sidecar.
#[must_use]
pub fn build_deployment(tunnel: &Tunnel, config: &OperatorConfig) -> Deployment {
    debug!(
        name = %tunnel.name,
        namespace = %tunnel.namespace,
        replicas = tunnel.replicas,
        external_dns = tunnel.external_dns.enabled,
        sidecars = tunnel.sidecars.len(),
        "Building Deployment"
    );

    let selector_labels = build_selector_labels(tunnel);
    let mut pod_labels = selector_labels.clone();
    pod_labels.insert(K8S_VERSION.into(), config.image_tag().into());

    Deployment {
        metadata: build_metadata(tunnel, config),
        spec: Some(DeploymentSpec {
            replicas: Some(tunnel.replicas),
            selector: LabelSelector {
                match_labels: Some(selector_labels),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(pod_labels),
                    ..Default::default()
                }),
                spec: Some(build_pod_spec(tunnel, config)),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn build_pod_spec(tunnel: &Tunnel, config: &OperatorConfig) -> PodSpec {
    let mut containers = vec![build_wireguard_container(tunnel, config)];
    if tunnel.external_dns.enabled {
        containers.push(build_unbound_container(tunnel));
    }
    containers.extend(tunnel.sidecars.iter().cloned());

    let (dns_policy, dns_config) = if tunnel.external_dns.enabled {
        (
            "None",
            Some(PodDNSConfig {
                nameservers: Some(vec![LOCAL_NAMESERVER.to_string()]),
                ..Default::default()
            }),
        )
    } else {
        ("Default", None)
    };

    PodSpec {
        containers,
        volumes: Some(build_volumes(tunnel)),
        dns_policy: Some(dns_policy.into()),
        dns_config,
        affinity: tunnel.affinity.clone(),
        security_context: Some(PodSecurityContext {
            sysctls: Some(vec![Sysctl {
                name: SYSCTL_IP_FORWARD.into(),
                value: "1".into(),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn build_wireguard_container(tunnel: &Tunnel, config: &OperatorConfig) -> Container {
    Container {
        name: CONTAINER_NAME_WIREGUARD.into(),
        image: Some(config.wireguard_image.clone()),
        ports: Some(vec![ContainerPort {
            name: Some(WIREGUARD_PORT_NAME.into()),
            container_port: tunnel.listen_port,
            protocol: Some("UDP".into()),
            ..Default::default()
        }]),
        security_context: Some(SecurityContext {
            privileged: Some(true),
            capabilities: Some(Capabilities {
                add: Some(WIREGUARD_CAPABILITIES.iter().map(|c| (*c).to_string()).collect()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        volume_mounts: Some(vec![VolumeMount {
            name: VOLUME_WIREGUARD_CONFIG.into(),
            mount_path: WIREGUARD_CONFIG_MOUNT_PATH.into(),
            read_only: Some(true),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

fn build_unbound_container(tunnel: &Tunnel) -> Container {
    Container {
        name: CONTAINER_NAME_UNBOUND.into(),
        image: Some(tunnel.external_dns.image.clone()),
        volume_mounts: Some(vec![VolumeMount {
            name: VOLUME_UNBOUND_CONFIG.into(),
            mount_path: UNBOUND_CONFIG_MOUNT_PATH.into(),
            read_only: Some(true),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

fn build_volumes(tunnel: &Tunnel) -> Vec<Volume> {
    let mut volumes = vec![Volume {
        name: VOLUME_WIREGUARD_CONFIG.into(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(tunnel.name.clone()),
            items: Some(vec![KeyToPath {
                key: tunnel.config_key.into(),
                path: WIREGUARD_CONFIG_FILENAME.into(),
                ..Default::default()
            }]),
            // Bring-your-own-key peers have no rendered configuration
            optional: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    }];

    if tunnel.external_dns.enabled {
        volumes.push(Volume {
            name: VOLUME_UNBOUND_CONFIG.into(),
            config_map: Some(ConfigMapVolumeSource {
                name: tunnel.name.clone(),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    volumes
}

// ============================================================================
// Service
// ============================================================================

/// Build the UDP Service exposing the tunnel.
#[must_use]
pub fn build_service(tunnel: &Tunnel, config: &OperatorConfig) -> Service {
    let mut metadata = build_metadata(tunnel, config);
    if !tunnel.service_annotations.is_empty() {
        metadata.annotations = Some(tunnel.service_annotations.clone());
    }

    Service {
        metadata,
        spec: Some(ServiceSpec {
            type_: Some(tunnel.service_type.clone()),
            selector: Some(build_selector_labels(tunnel)),
            ports: Some(vec![ServicePort {
                name: Some(WIREGUARD_PORT_NAME.into()),
                port: tunnel.listen_port,
                target_port: Some(IntOrString::Int(tunnel.listen_port)),
                protocol: Some("UDP".into()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

// ============================================================================
// Drift detection
// ============================================================================

/// Patch the managed Secret entries if they differ from `desired`.
///
/// Only entries in `desired` are compared; unknown entries are left alone.
#[must_use]
pub fn secret_drift(current: &Secret, desired: &BTreeMap<String, String>) -> Option<Secret> {
    let live = secret_string_data(current);
    let drifted = desired.iter().any(|(k, v)| live.get(k) != Some(v));
    if !drifted {
        return None;
    }

    let mut updated = current.clone();
    let data = updated.data.get_or_insert_with(BTreeMap::new);
    data.extend(to_byte_data(desired));
    updated.string_data = None;
    Some(updated)
}

/// Patch the ConfigMap data if it differs from `desired`.
#[must_use]
pub fn configmap_drift(current: &ConfigMap, desired: &ConfigMap) -> Option<ConfigMap> {
    if current.data == desired.data {
        return None;
    }
    let mut updated = current.clone();
    updated.data.clone_from(&desired.data);
    Some(updated)
}

/// Patch the replica count if it differs from `desired`.
#[must_use]
pub fn deployment_drift(current: &Deployment, desired: &Deployment) -> Option<Deployment> {
    let desired_replicas = desired.spec.as_ref().and_then(|s| s.replicas);
    let current_replicas = current.spec.as_ref().and_then(|s| s.replicas);
    if current_replicas == desired_replicas {
        return None;
    }

    let mut updated = current.clone();
    if let Some(spec) = updated.spec.as_mut() {
        spec.replicas = desired_replicas;
    } else {
        updated.spec.clone_from(&desired.spec);
    }
    Some(updated)
}

/// Patch the Service type, ports and annotations if they differ from `desired`.
///
/// Annotations added by other controllers are kept; only the desired ones are
/// enforced. Node ports and cluster IPs allocated by the platform are preserved.
#[must_use]
pub fn service_drift(current: &Service, desired: &Service) -> Option<Service> {
    let current_spec = current.spec.clone().unwrap_or_default();
    let desired_spec = desired.spec.clone().unwrap_or_default();

    let type_drift = current_spec.type_ != desired_spec.type_;
    let ports_drift = port_signature(&current_spec) != port_signature(&desired_spec);
    let current_annotations = current.annotations();
    let desired_annotations = desired.metadata.annotations.clone().unwrap_or_default();
    let annotation_drift = desired_annotations
        .iter()
        .any(|(k, v)| current_annotations.get(k) != Some(v));

    if !type_drift && !ports_drift && !annotation_drift {
        return None;
    }

    let mut updated = current.clone();
    if annotation_drift {
        updated
            .metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .extend(desired_annotations);
    }
    let spec = updated.spec.get_or_insert_with(ServiceSpec::default);
    spec.type_ = desired_spec.type_;
    if ports_drift {
        spec.ports = desired_spec.ports;
    }
    Some(updated)
}

fn port_signature(spec: &ServiceSpec) -> Vec<(i32, Option<String>, Option<IntOrString>)> {
    spec.ports
        .iter()
        .flatten()
        .map(|p| (p.port, p.protocol.clone(), p.target_port.clone()))
        .collect()
}

#[cfg(test)]
#[path = "wireguard_resources_tests.rs"]
mod wireguard_resources_tests;
