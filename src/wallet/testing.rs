//! Scripted in-memory issuer for unit tests
//!
//! Signs with fixed private keys, verifies presented proofs and tracks spent
//! secrets per mint URL. Every connector call is recorded by name.

use crate::crypto::curve::{base_mul, scalar_from_bytes};
use crate::crypto::{construct_proofs, sign_blinded, verify_signature, BlindedOutput};
use crate::error::{WalletError, WalletResult};
use crate::mint::{
    CheckFeesRequest, CheckFeesResponse, CheckSpendableRequest, CheckSpendableResponse, MeltRequest,
    MeltResponse, MintConnector, MintErrorBody, MintRequest, PostMintResponse, RequestMintResponse,
    SplitRequest, SplitResponse,
};
use crate::types::{BlindedMessage, BlindedSignature, KeysetId, MintKeys, Proof};
use crate::wallet::keyset::derive_keyset_id;
use crate::wallet::split::default_split;
use secp256k1::SecretKey;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const MINT_URL: &str = "https://mint.test";
pub const FOREIGN_MINT_URL: &str = "https://other-mint.test";
pub const OFFLINE_MINT_URL: &str = "https://offline-mint.test";

/// Largest denomination the mock signs is `2^MAX_ORDER`
const MAX_ORDER: u32 = 10;

pub struct MockKeyset {
    pub id: KeysetId,
    pub keys: MintKeys,
    secrets: BTreeMap<u64, SecretKey>,
}

impl MockKeyset {
    fn from_seed(seed: u8) -> Self {
        let secrets: BTreeMap<u64, SecretKey> = (0..=MAX_ORDER)
            .map(|i| {
                let k = scalar_from_bytes(&[seed + i as u8; 32]).unwrap();
                (1u64 << i, k)
            })
            .collect();
        let keys = MintKeys::new(secrets.iter().map(|(amount, k)| (*amount, base_mul(k))).collect());
        let id = derive_keyset_id(&keys);
        Self { id, keys, secrets }
    }

    fn sign(&self, message: &BlindedMessage, amount: u64) -> WalletResult<BlindedSignature> {
        let k = self
            .secrets
            .get(&amount)
            .ok_or_else(|| rejected(&format!("Amount {} not supported", amount)))?;
        Ok(BlindedSignature {
            id: self.id.clone(),
            amount,
            c: sign_blinded(k, &message.blinded)?,
        })
    }
}

struct MintBook {
    keysets: Vec<MockKeyset>,
    active: usize,
    signing: usize,
    spent: HashSet<String>,
    next_seed: u8,
}

impl MintBook {
    fn new(seed: u8) -> Self {
        Self {
            keysets: vec![MockKeyset::from_seed(seed)],
            active: 0,
            signing: 0,
            spent: HashSet::new(),
            next_seed: seed + 20,
        }
    }

    fn add_keyset(&mut self) -> usize {
        self.keysets.push(MockKeyset::from_seed(self.next_seed));
        self.next_seed += 20;
        self.keysets.len() - 1
    }

    fn keyset(&self, id: &KeysetId) -> Option<&MockKeyset> {
        self.keysets.iter().find(|k| &k.id == id)
    }

    fn sign_all(&self, outputs: &[BlindedMessage]) -> WalletResult<Vec<BlindedSignature>> {
        let keyset = &self.keysets[self.signing];
        outputs.iter().map(|m| keyset.sign(m, m.amount)).collect()
    }

    fn verify(&self, proofs: &[Proof]) -> WalletResult<u64> {
        let mut seen = HashSet::new();
        for proof in proofs {
            if self.spent.contains(&proof.secret) || !seen.insert(proof.secret.as_str()) {
                return Err(rejected("Token already spent."));
            }
            let k = self
                .keyset(&proof.id)
                .and_then(|ks| ks.secrets.get(&proof.amount))
                .ok_or_else(|| rejected("Could not verify proofs."))?;
            if !verify_signature(k, &proof.c, &proof.secret)? {
                return Err(rejected("Could not verify proofs."));
            }
        }
        Ok(proofs.iter().map(|p| p.amount).sum())
    }

    fn spend(&mut self, proofs: &[Proof]) {
        self.spent.extend(proofs.iter().map(|p| p.secret.clone()));
    }
}

struct MockState {
    books: HashMap<String, MintBook>,
    invoice_paid: bool,
    melt_paid: bool,
    fee: u64,
    melt_change: u64,
    misreport_keys: bool,
    extra_signatures: usize,
    calls: Vec<&'static str>,
}

pub struct MockMint {
    state: RefCell<MockState>,
}

fn rejected(message: &str) -> WalletError {
    MintErrorBody {
        error: Some(message.to_string()),
        code: Some(0),
        detail: None,
    }
    .into()
}

impl MockMint {
    pub fn new() -> Self {
        let mut books = HashMap::new();
        books.insert(MINT_URL.to_string(), MintBook::new(1));
        books.insert(FOREIGN_MINT_URL.to_string(), MintBook::new(100));

        Self {
            state: RefCell::new(MockState {
                books,
                invoice_paid: true,
                melt_paid: true,
                fee: 2,
                melt_change: 0,
                misreport_keys: false,
                extra_signatures: 0,
                calls: Vec::new(),
            }),
        }
    }

    pub fn active_id(&self) -> KeysetId {
        let state = self.state.borrow();
        let book = &state.books[MINT_URL];
        book.keysets[book.active].id.clone()
    }

    pub fn active_keys(&self) -> MintKeys {
        let state = self.state.borrow();
        let book = &state.books[MINT_URL];
        book.keysets[book.active].keys.clone()
    }

    /// Switch the wallet's mint to a fresh keyset, signing with it from now on
    pub fn rotate(&self) {
        let mut state = self.state.borrow_mut();
        let book = state.books.get_mut(MINT_URL).unwrap();
        let idx = book.add_keyset();
        book.active = idx;
        book.signing = idx;
    }

    /// Sign with a keyset that is not the advertised active one
    pub fn sign_with_inactive_keyset(&self) {
        let mut state = self.state.borrow_mut();
        let book = state.books.get_mut(MINT_URL).unwrap();
        book.signing = book.add_keyset();
    }

    pub fn set_invoice_paid(&self, paid: bool) {
        self.state.borrow_mut().invoice_paid = paid;
    }

    pub fn set_melt_paid(&self, paid: bool) {
        self.state.borrow_mut().melt_paid = paid;
    }

    pub fn set_fee(&self, fee: u64) {
        self.state.borrow_mut().fee = fee;
    }

    pub fn set_melt_change(&self, change: u64) {
        self.state.borrow_mut().melt_change = change;
    }

    /// Answer keyset lookups by id with the active keys instead
    pub fn set_misreport_keys(&self, misreport: bool) {
        self.state.borrow_mut().misreport_keys = misreport;
    }

    /// Append `count` unrequested signatures to split and melt responses
    pub fn set_extra_signatures(&self, count: usize) {
        self.state.borrow_mut().extra_signatures = count;
    }

    pub fn calls(&self, name: &str) -> usize {
        self.state.borrow().calls.iter().filter(|c| **c == name).count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.borrow().calls.len()
    }

    pub fn is_spent(&self, mint_url: &str, proof: &Proof) -> bool {
        self.state.borrow().books[mint_url].spent.contains(&proof.secret)
    }

    /// Valid proofs issued out of band, without recording a call
    pub fn issue(&self, mint_url: &str, amounts: &[u64]) -> Vec<Proof> {
        let state = self.state.borrow();
        let book = &state.books[mint_url];
        let keyset = &book.keysets[book.signing];

        let outputs: Vec<BlindedOutput> = amounts.iter().map(|a| BlindedOutput::random(*a).unwrap()).collect();
        let signatures: Vec<BlindedSignature> = outputs
            .iter()
            .map(|o| keyset.sign(&o.message(), o.amount).unwrap())
            .collect();
        construct_proofs(&signatures, &outputs, |_| Some(&keyset.keys)).unwrap()
    }

    fn enter(&self, name: &'static str, mint_url: &str) -> WalletResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(name);
        if state.books.contains_key(mint_url) {
            Ok(())
        } else {
            Err(WalletError::network_error("Connection failed"))
        }
    }
}

impl MintConnector for MockMint {
    async fn get_keys(&self, mint_url: &str, keyset_id: Option<&KeysetId>) -> WalletResult<MintKeys> {
        self.enter("get_keys", mint_url)?;
        let state = self.state.borrow();
        let book = &state.books[mint_url];
        match keyset_id {
            None => Ok(book.keysets[book.active].keys.clone()),
            Some(_) if state.misreport_keys => Ok(book.keysets[book.active].keys.clone()),
            Some(id) => book
                .keyset(id)
                .map(|ks| ks.keys.clone())
                .ok_or_else(|| rejected("keyset does not exist")),
        }
    }

    async fn request_mint(&self, mint_url: &str, amount: u64) -> WalletResult<RequestMintResponse> {
        self.enter("request_mint", mint_url)?;
        Ok(RequestMintResponse {
            pr: format!("lnbc{}n1mockinvoice", amount),
            hash: format!("hash-{}", amount),
        })
    }

    async fn mint(&self, mint_url: &str, request: &MintRequest, _hash: &str) -> WalletResult<PostMintResponse> {
        self.enter("mint", mint_url)?;
        let state = self.state.borrow();
        if !state.invoice_paid {
            return Err(rejected("Lightning invoice not paid yet."));
        }
        Ok(PostMintResponse {
            promises: state.books[mint_url].sign_all(&request.outputs)?,
        })
    }

    async fn split(&self, mint_url: &str, request: &SplitRequest) -> WalletResult<SplitResponse> {
        self.enter("split", mint_url)?;
        let mut state = self.state.borrow_mut();
        let extra = state.extra_signatures;
        let book = state.books.get_mut(mint_url).unwrap();

        let input = book.verify(&request.proofs)?;
        let output: u64 = request.outputs.iter().map(|o| o.amount).sum();
        if input != output {
            return Err(rejected("split amount mismatch"));
        }

        let mut promises = book.sign_all(&request.outputs)?;
        if let Some(first) = promises.first().cloned() {
            promises.extend(std::iter::repeat(first).take(extra));
        }
        book.spend(&request.proofs);
        Ok(SplitResponse { promises })
    }

    async fn melt(&self, mint_url: &str, request: &MeltRequest) -> WalletResult<MeltResponse> {
        self.enter("melt", mint_url)?;
        let mut state = self.state.borrow_mut();
        let (paid, change_amount, extra) = (state.melt_paid, state.melt_change, state.extra_signatures);
        let book = state.books.get_mut(mint_url).unwrap();

        book.verify(&request.proofs)?;
        if !paid {
            return Ok(MeltResponse {
                paid: false,
                preimage: None,
                change: None,
            });
        }

        let keyset = &book.keysets[book.signing];
        let mut change = default_split(change_amount)
            .into_iter()
            .zip(&request.outputs)
            .map(|(amount, blank)| keyset.sign(blank, amount))
            .collect::<WalletResult<Vec<_>>>()?;
        for _ in 0..extra {
            change.push(keyset.sign(&request.outputs[0], 1)?);
        }
        book.spend(&request.proofs);

        Ok(MeltResponse {
            paid: true,
            preimage: Some("00".repeat(32)),
            change: (!change.is_empty()).then_some(change),
        })
    }

    async fn check_fees(&self, mint_url: &str, _request: &CheckFeesRequest) -> WalletResult<CheckFeesResponse> {
        self.enter("check_fees", mint_url)?;
        Ok(CheckFeesResponse {
            fee: self.state.borrow().fee,
        })
    }

    async fn check(&self, mint_url: &str, request: &CheckSpendableRequest) -> WalletResult<CheckSpendableResponse> {
        self.enter("check", mint_url)?;
        let state = self.state.borrow();
        let book = &state.books[mint_url];
        Ok(CheckSpendableResponse {
            spendable: request.proofs.iter().map(|p| !book.spent.contains(&p.secret)).collect(),
        })
    }
}
