use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use rand_core::{CryptoRng, OsRng, RngCore};
use shared::derive::ROOT_KEY_LEN;
use shared::error::SharedError;
use zeroize::Zeroizing;

use crate::KeygenArgs;

pub fn run(args: &KeygenArgs) -> Result<(), SharedError> {
    let root_key = generate_root_key(&mut OsRng);
    write_root_key(&args.out, &root_key)?;
    println!(
        "Wrote {ROOT_KEY_LEN}-byte HMAC root key to '{}'. Burn it into eFuse key slot 4 and keep it offline.",
        args.out.display()
    );
    Ok(())
}

pub fn generate_root_key<R>(rng: &mut R) -> Zeroizing<[u8; ROOT_KEY_LEN]>
where
    R: RngCore + CryptoRng,
{
    let mut key = Zeroizing::new([0u8; ROOT_KEY_LEN]);
    rng.fill_bytes(key.as_mut_slice());
    key
}

/// Create `path` with the raw key; an existing file is left untouched and reported as an error.
pub fn write_root_key(path: &Path, key: &[u8; ROOT_KEY_LEN]) -> Result<(), SharedError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|err| io_error("prepare key directory", parent, err))?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|err| {
        if err.kind() == io::ErrorKind::AlreadyExists {
            SharedError::Key(format!("refusing to overwrite existing key '{}'", path.display()))
        } else {
            io_error("create key file", path, err)
        }
    })?;
    file.write_all(key)
        .and_then(|_| file.sync_all())
        .map_err(|err| io_error("write key file", path, err))
}

pub(crate) fn io_error(context: &str, path: &Path, err: io::Error) -> SharedError {
    SharedError::Io(format!("{context} at '{}': {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;
    use tempfile::tempdir;

    #[test]
    fn writes_raw_key_bytes() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("keys").join("hmac_key.bin");
        let key = generate_root_key(&mut ChaCha20Rng::from_seed([3u8; 32]));

        write_root_key(&path, &key).expect("write key");

        assert_eq!(fs::read(&path).expect("read back"), key.to_vec());
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("hmac_key.bin");
        fs::write(&path, b"existing").expect("seed file");

        let err = write_root_key(&path, &[0u8; ROOT_KEY_LEN]).expect_err("must refuse");

        assert!(matches!(err, SharedError::Key(_)));
        assert_eq!(fs::read(&path).expect("read back"), b"existing");
    }

    #[test]
    fn generated_keys_differ() {
        let mut rng = ChaCha20Rng::from_seed([9u8; 32]);
        let first = generate_root_key(&mut rng);
        let second = generate_root_key(&mut rng);
        assert_ne!(*first, *second);
    }

    #[cfg(unix)]
    #[test]
    fn key_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("hmac_key.bin");
        write_root_key(&path, &[1u8; ROOT_KEY_LEN]).expect("write key");
        let mode = fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }
}
