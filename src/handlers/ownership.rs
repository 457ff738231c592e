//! Owning user/group lookups, by name and by numeric id.

use std::os::unix::fs::MetadataExt;
use std::path::Path;

use nix::unistd::{Gid, Group, Uid, User};

use crate::error::AgentError;
use crate::protocol::response::Reply;

pub fn group(id: i64, path: &Path) -> Reply {
    match owning_gid(path).and_then(lookup_group_name) {
        Ok(name) => Reply::Group { id, group: name },
        Err(err) => Reply::error(id, err),
    }
}

pub fn group_id(id: i64, path: &Path) -> Reply {
    match owning_gid(path) {
        Ok(gid) => Reply::GroupId { id, group_id: gid.as_raw() },
        Err(err) => Reply::error(id, err),
    }
}

pub fn owner(id: i64, path: &Path) -> Reply {
    match owning_uid(path).and_then(lookup_user_name) {
        Ok(name) => Reply::Owner { id, owner: name },
        Err(err) => Reply::error(id, err),
    }
}

pub fn owner_id(id: i64, path: &Path) -> Reply {
    match owning_uid(path) {
        Ok(uid) => Reply::OwnerId { id, owner_id: uid.as_raw() },
        Err(err) => Reply::error(id, err),
    }
}

fn owning_uid(path: &Path) -> Result<Uid, AgentError> {
    Ok(Uid::from_raw(std::fs::metadata(path)?.uid()))
}

fn owning_gid(path: &Path) -> Result<Gid, AgentError> {
    Ok(Gid::from_raw(std::fs::metadata(path)?.gid()))
}

fn lookup_user_name(uid: Uid) -> Result<String, AgentError> {
    User::from_uid(uid)
        .map_err(AgentError::from)?
        .map(|user| user.name)
        .ok_or_else(|| AgentError::invalid_input(format!("no passwd entry for uid {uid}")))
}

fn lookup_group_name(gid: Gid) -> Result<String, AgentError> {
    Group::from_gid(gid)
        .map_err(AgentError::from)?
        .map(|group| group.name)
        .ok_or_else(|| AgentError::invalid_input(format!("no group entry for gid {gid}")))
}
