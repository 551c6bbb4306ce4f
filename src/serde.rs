//! JSON (de)serialization of the wire carriers.
//!
//! Group elements serialize as lowercase hex strings of their canonical
//! bytes, byte strings as lowercase hex, and big integers as decimal
//! strings. Field names follow the external interface: `x`/`y` for
//! ciphertexts, `c`/`f` for sigma proofs, `nr`/`decShare`/`zkp` for
//! decryption shares, `nr`/`keyShare`/`commitment` for private key
//! shares, and the `t`/`s`/`c`/`cHat` block structure for shuffle proofs.
//!
//! Deserialized group elements are validated; invalid elements are
//! rejected at the serde layer.

use num_bigint::BigUint;
use serde::{
    de::{DeserializeOwned, Error as DeError},
    Deserialize, Deserializer, Serialize, Serializer,
};

use std::collections::HashMap;

use crate::{
    bytes::ByteString,
    encryption::{Ciphertext, MultiCiphertext},
    group::Group,
    proofs::{DlogProof, LogEqualityProof},
    sharing::{DecryptionShare, PrivateKeyShare},
    shuffle::ShuffleProof,
};

fn element_to_hex<G: Group>(element: &G::Element) -> String {
    hex::encode(G::serialize_element(element))
}

fn element_from_hex<G: Group, E: DeError>(hex_str: &str) -> Result<G::Element, E> {
    let bytes = hex::decode(hex_str)
        .map_err(|_| E::custom("group element is not valid hex"))?;
    G::deserialize_element(&bytes)
        .ok_or_else(|| E::custom("bytes do not represent a valid group element"))
}

fn uint_to_decimal(value: &BigUint) -> String {
    value.to_str_radix(10)
}

fn uint_from_decimal<E: DeError>(decimal: &str) -> Result<BigUint, E> {
    BigUint::parse_bytes(decimal.as_bytes(), 10)
        .ok_or_else(|| E::custom("big integer is not a decimal string"))
}

impl Serialize for ByteString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ByteString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex_str = String::deserialize(deserializer)?;
        Self::from_hex(&hex_str).map_err(D::Error::custom)
    }
}

#[derive(Serialize, Deserialize)]
struct CiphertextRepr {
    x: String,
    y: String,
}

impl<G: Group> Serialize for Ciphertext<G> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        CiphertextRepr {
            x: element_to_hex::<G>(self.x()),
            y: element_to_hex::<G>(self.y()),
        }
        .serialize(serializer)
    }
}

impl<'de, G: Group> Deserialize<'de> for Ciphertext<G> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = CiphertextRepr::deserialize(deserializer)?;
        Ok(Self::from_parts(
            element_from_hex::<G, D::Error>(&repr.x)?,
            element_from_hex::<G, D::Error>(&repr.y)?,
        ))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(bound = "C: Serialize + DeserializeOwned")]
struct MultiCiphertextRepr<C> {
    ciphertexts: Vec<C>,
    #[serde(
        rename = "auxData",
        default,
        skip_serializing_if = "HashMap::is_empty"
    )]
    aux_data: HashMap<String, String>,
}

impl<G: Group> Serialize for MultiCiphertext<G> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        MultiCiphertextRepr {
            ciphertexts: self.ciphertexts().to_vec(),
            aux_data: self.aux_data().clone(),
        }
        .serialize(serializer)
    }
}

impl<'de, G: Group> Deserialize<'de> for MultiCiphertext<G> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = MultiCiphertextRepr::<Ciphertext<G>>::deserialize(deserializer)?;
        Ok(Self::new(repr.ciphertexts).with_aux_data(repr.aux_data))
    }
}

/// Shared representation of the `(c, f)` sigma proofs.
#[derive(Serialize, Deserialize)]
struct SigmaProofRepr {
    c: String,
    f: String,
}

impl<G: Group> Serialize for DlogProof<G> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SigmaProofRepr {
            c: uint_to_decimal(self.challenge()),
            f: uint_to_decimal(self.response()),
        }
        .serialize(serializer)
    }
}

impl<'de, G: Group> Deserialize<'de> for DlogProof<G> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = SigmaProofRepr::deserialize(deserializer)?;
        Ok(Self::from_parts(
            uint_from_decimal::<D::Error>(&repr.c)?,
            uint_from_decimal::<D::Error>(&repr.f)?,
        ))
    }
}

impl<G: Group> Serialize for LogEqualityProof<G> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SigmaProofRepr {
            c: uint_to_decimal(self.challenge()),
            f: uint_to_decimal(self.response()),
        }
        .serialize(serializer)
    }
}

impl<'de, G: Group> Deserialize<'de> for LogEqualityProof<G> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = SigmaProofRepr::deserialize(deserializer)?;
        Ok(Self::from_parts(
            uint_from_decimal::<D::Error>(&repr.c)?,
            uint_from_decimal::<D::Error>(&repr.f)?,
        ))
    }
}

#[derive(Serialize, Deserialize)]
struct DecryptionShareRepr {
    nr: usize,
    #[serde(rename = "decShare")]
    dec_share: String,
    zkp: SigmaProofRepr,
}

impl<G: Group> Serialize for DecryptionShare<G> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DecryptionShareRepr {
            nr: self.index(),
            dec_share: element_to_hex::<G>(self.factor()),
            zkp: SigmaProofRepr {
                c: uint_to_decimal(self.proof().challenge()),
                f: uint_to_decimal(self.proof().response()),
            },
        }
        .serialize(serializer)
    }
}

impl<'de, G: Group> Deserialize<'de> for DecryptionShare<G> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = DecryptionShareRepr::deserialize(deserializer)?;
        Ok(Self::from_parts(
            repr.nr,
            element_from_hex::<G, D::Error>(&repr.dec_share)?,
            LogEqualityProof::from_parts(
                uint_from_decimal::<D::Error>(&repr.zkp.c)?,
                uint_from_decimal::<D::Error>(&repr.zkp.f)?,
            ),
        ))
    }
}

#[derive(Serialize, Deserialize)]
struct PrivateKeyShareRepr {
    nr: usize,
    #[serde(rename = "keyShare")]
    key_share: String,
    commitment: String,
}

impl<G: Group> Serialize for PrivateKeyShare<G> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PrivateKeyShareRepr {
            nr: self.index(),
            key_share: uint_to_decimal(self.secret()),
            commitment: element_to_hex::<G>(self.commitment()),
        }
        .serialize(serializer)
    }
}

impl<'de, G: Group> Deserialize<'de> for PrivateKeyShare<G> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = PrivateKeyShareRepr::deserialize(deserializer)?;
        Ok(Self::from_parts(
            repr.nr,
            uint_from_decimal::<D::Error>(&repr.key_share)?,
            element_from_hex::<G, D::Error>(&repr.commitment)?,
        ))
    }
}

#[derive(Serialize, Deserialize)]
struct ShuffleAnnouncementRepr {
    t1: String,
    t2: String,
    t3: String,
    t4x: Vec<String>,
    t4y: Vec<String>,
    #[serde(rename = "tHat")]
    t_hat: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct ShuffleResponsesRepr {
    s1: String,
    s2: String,
    s3: String,
    s4: Vec<String>,
    #[serde(rename = "sHat")]
    s_hat: Vec<String>,
    #[serde(rename = "sPrime")]
    s_prime: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct ShuffleProofRepr {
    t: ShuffleAnnouncementRepr,
    s: ShuffleResponsesRepr,
    c: Vec<String>,
    #[serde(rename = "cHat")]
    c_hat: Vec<String>,
}

fn elements_to_hex<G: Group>(elements: &[G::Element]) -> Vec<String> {
    elements.iter().map(element_to_hex::<G>).collect()
}

fn elements_from_hex<G: Group, E: DeError>(hex_strs: &[String]) -> Result<Vec<G::Element>, E> {
    hex_strs
        .iter()
        .map(|hex_str| element_from_hex::<G, E>(hex_str))
        .collect()
}

fn uints_to_decimal(values: &[BigUint]) -> Vec<String> {
    values.iter().map(uint_to_decimal).collect()
}

fn uints_from_decimal<E: DeError>(decimals: &[String]) -> Result<Vec<BigUint>, E> {
    decimals
        .iter()
        .map(|decimal| uint_from_decimal::<E>(decimal))
        .collect()
}

impl<G: Group> Serialize for ShuffleProof<G> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ShuffleProofRepr {
            t: ShuffleAnnouncementRepr {
                t1: element_to_hex::<G>(&self.announcement.t1),
                t2: element_to_hex::<G>(&self.announcement.t2),
                t3: element_to_hex::<G>(&self.announcement.t3),
                t4x: elements_to_hex::<G>(&self.announcement.t4x),
                t4y: elements_to_hex::<G>(&self.announcement.t4y),
                t_hat: elements_to_hex::<G>(&self.announcement.t_hat),
            },
            s: ShuffleResponsesRepr {
                s1: uint_to_decimal(&self.responses.s1),
                s2: uint_to_decimal(&self.responses.s2),
                s3: uint_to_decimal(&self.responses.s3),
                s4: uints_to_decimal(&self.responses.s4),
                s_hat: uints_to_decimal(&self.responses.s_hat),
                s_prime: uints_to_decimal(&self.responses.s_prime),
            },
            c: elements_to_hex::<G>(&self.permutation_commitments),
            c_hat: elements_to_hex::<G>(&self.chain_commitments),
        }
        .serialize(serializer)
    }
}

impl<'de, G: Group> Deserialize<'de> for ShuffleProof<G> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use crate::shuffle::proof::{Announcement, Responses};

        let repr = ShuffleProofRepr::deserialize(deserializer)?;
        Ok(Self {
            permutation_commitments: elements_from_hex::<G, D::Error>(&repr.c)?,
            chain_commitments: elements_from_hex::<G, D::Error>(&repr.c_hat)?,
            announcement: Announcement {
                t1: element_from_hex::<G, D::Error>(&repr.t.t1)?,
                t2: element_from_hex::<G, D::Error>(&repr.t.t2)?,
                t3: element_from_hex::<G, D::Error>(&repr.t.t3)?,
                t4x: elements_from_hex::<G, D::Error>(&repr.t.t4x)?,
                t4y: elements_from_hex::<G, D::Error>(&repr.t.t4y)?,
                t_hat: elements_from_hex::<G, D::Error>(&repr.t.t_hat)?,
            },
            responses: Responses {
                s1: uint_from_decimal::<D::Error>(&repr.s.s1)?,
                s2: uint_from_decimal::<D::Error>(&repr.s.s2)?,
                s3: uint_from_decimal::<D::Error>(&repr.s.s3)?,
                s4: uints_from_decimal::<D::Error>(&repr.s.s4)?,
                s_hat: uints_from_decimal::<D::Error>(&repr.s.s_hat)?,
                s_prime: uints_from_decimal::<D::Error>(&repr.s.s_prime)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use rand::thread_rng;
    use serde_json::json;

    use super::*;
    use crate::group::Secp256k1;

    type G = Secp256k1;

    #[test]
    fn ciphertext_json_shape() {
        let mut rng = thread_rng();
        let keypair = crate::Keypair::<G>::generate(&mut rng);
        let ciphertext = keypair
            .public()
            .encrypt(&BigUint::from(7_u32), &mut rng)
            .unwrap();

        let value = serde_json::to_value(&ciphertext).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(
            object.keys().collect::<Vec<_>>(),
            ["x", "y"],
            "field names are part of the wire format"
        );
        let hex_x = object["x"].as_str().unwrap();
        assert_eq!(hex_x.len(), 66);
        assert_eq!(hex_x, hex_x.to_lowercase());

        let restored: Ciphertext<G> = serde_json::from_value(value).unwrap();
        assert_eq!(restored, ciphertext);
    }

    #[test]
    fn multi_ciphertext_omits_empty_aux_data() {
        let mut rng = thread_rng();
        let keypair = crate::Keypair::<G>::generate(&mut rng);
        let multi = MultiCiphertext::new(vec![keypair
            .public()
            .encrypt(&BigUint::from(1_u32), &mut rng)
            .unwrap()]);

        let value = serde_json::to_value(&multi).unwrap();
        assert!(value.get("auxData").is_none());

        let tagged = multi
            .clone()
            .with_aux_data([("k".to_string(), "v".to_string())].into_iter().collect());
        let value = serde_json::to_value(&tagged).unwrap();
        assert_eq!(value["auxData"]["k"], json!("v"));
        let restored: MultiCiphertext<G> = serde_json::from_value(value).unwrap();
        assert_eq!(restored, tagged);
    }

    #[test]
    fn sigma_proofs_serialize_as_decimal_strings() {
        let mut rng = thread_rng();
        let keypair = crate::Keypair::<G>::generate(&mut rng);
        let proof = DlogProof::new(&keypair, &mut rng);

        let value = serde_json::to_value(&proof).unwrap();
        let challenge = value["c"].as_str().unwrap();
        assert!(challenge.bytes().all(|byte| byte.is_ascii_digit()));

        let restored: DlogProof<G> = serde_json::from_value(value).unwrap();
        restored
            .verify(keypair.public().as_element())
            .expect("proof survives the round trip");
    }

    #[test]
    fn invalid_elements_are_rejected_on_deserialization() {
        let result: Result<Ciphertext<G>, _> = serde_json::from_value(json!({
            "x": "00",
            "y": "0203",
        }));
        assert!(result.is_err());
    }
}
