//! Typed override merge for configuration documents.
//!
//! Each field falls into one of three categories and is merged by the matching
//! helper, so the semantics are visible per field rather than hidden in a
//! generic deep-merge:
//!
//! - scalars: a later `Some` replaces the earlier value;
//! - mappings: later entries replace earlier ones key by key;
//! - lists: a later `Some` replaces the whole list, elements are never combined.

use crate::document::ConfigDocument;
use std::collections::BTreeMap;

/// Fold `next` into `acc`, with `next` winning every conflict.
pub fn merge_into(acc: &mut ConfigDocument, next: ConfigDocument) {
    let ConfigDocument {
        base_image,
        run_image,
        boot_command,
        no_boot_command,
        docker_args,
        deployment,
        templates,
        expose,
        env,
        labels,
        volumes,
        links,
    } = next;

    override_scalar(&mut acc.base_image, base_image);
    override_scalar(&mut acc.run_image, run_image);
    override_scalar(&mut acc.boot_command, boot_command);
    override_scalar(&mut acc.no_boot_command, no_boot_command);
    override_scalar(&mut acc.docker_args, docker_args);
    override_scalar(&mut acc.deployment, deployment);

    override_by_key(&mut acc.env, env);
    override_by_key(&mut acc.labels, labels);

    replace_list(&mut acc.templates, templates);
    replace_list(&mut acc.expose, expose);
    replace_list(&mut acc.volumes, volumes);
    replace_list(&mut acc.links, links);
}

fn override_scalar<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn override_by_key(
    slot: &mut Option<BTreeMap<String, String>>,
    value: Option<BTreeMap<String, String>>,
) {
    if let Some(entries) = value {
        slot.get_or_insert_with(BTreeMap::new).extend(entries);
    }
}

fn replace_list<T>(slot: &mut Option<Vec<T>>, value: Option<Vec<T>>) {
    if value.is_some() {
        *slot = value;
    }
}
