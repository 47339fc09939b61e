use dkim_sign::{
    crypto::{HashAlgorithm, SigningKey},
    decode_base64,
    header::{FieldName, HeaderFields},
    message::Message,
    message_hash,
    signature::Canonicalization,
};
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha2::Sha256;
use std::{io, str};
use tokio::fs;

pub async fn read_pem_file(file_name: &str) -> io::Result<Vec<u8>> {
    fs::read(file_name).await
}

pub async fn read_signing_key_from_file(file_name: &str) -> io::Result<SigningKey> {
    let s = fs::read_to_string(file_name).await?;
    Ok(SigningKey::from_pem(s).unwrap())
}

/// Returns the tags of the last header field of a signed message, which must
/// be the *DKIM-Signature* header field.
pub fn signature_tags(signed: &[u8]) -> Vec<(String, String)> {
    let message = Message::parse(signed).unwrap();
    let (name, value) = message.headers().as_ref().last().unwrap();

    assert_eq!(*name, "DKIM-Signature");

    let value = str::from_utf8(value.as_ref()).unwrap();

    assert!(value.starts_with(' ') && !value.starts_with("  "));

    value[1..]
        .split("; ")
        .map(|t| {
            let (k, v) = t.split_once('=').unwrap();
            (k.to_owned(), v.to_owned())
        })
        .collect()
}

pub fn get_tag<'a>(tags: &'a [(String, String)], name: &str) -> Option<&'a str> {
    tags.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
}

/// Verifies the signature that was added to a message with the public half
/// of the given key.
pub fn verify(signing_key: &SigningKey, signed: &[u8]) -> bool {
    let message = Message::parse(signed).unwrap();
    let tags = signature_tags(signed);

    let fields = message.headers().as_ref();
    let (_, value) = &fields[fields.len() - 1];
    let headers = HeaderFields::new(fields[..fields.len() - 1].to_vec()).unwrap();

    let canon: Canonicalization = get_tag(&tags, "c").unwrap().parse().unwrap();
    let signed_headers: Vec<_> = get_tag(&tags, "h")
        .unwrap()
        .split(':')
        .map(|n| FieldName::new(n).unwrap())
        .collect();

    let body_hash = message_hash::compute_body_hash(HashAlgorithm::Sha256, canon.body, message.body());
    if *body_hash != decode_base64(get_tag(&tags, "bh").unwrap()).unwrap() {
        return false;
    }

    let b = get_tag(&tags, "b").unwrap();
    let value = str::from_utf8(value.as_ref()).unwrap();
    let unsigned_value = value.strip_suffix(b).unwrap();

    let data_hash = message_hash::compute_data_hash(
        HashAlgorithm::Sha256,
        canon.header,
        &headers,
        &signed_headers,
        "DKIM-Signature",
        unsigned_value,
    );

    let signature_data = decode_base64(b).unwrap();

    let SigningKey::Rsa(private_key) = signing_key;
    let public_key = RsaPublicKey::from(private_key);

    public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), &data_hash, &signature_data)
        .is_ok()
}
