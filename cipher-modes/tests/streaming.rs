//! Continuous-buffer behaviour and round trips over every length.

use cipher_modes::{Algorithm, CipherContext, CipherModeError, EngineSelector, Mode};

fn context(algorithm: Algorithm, mode: Mode) -> CipherContext {
    let mut ctx =
        CipherContext::with_selector(algorithm, mode, EngineSelector::software_only()).unwrap();
    let key: Vec<u8> = (1..=algorithm.default_key_length() as u8).collect();
    ctx.set_key(&key).unwrap();
    ctx.set_iv(&[0xA0, 0xB1, 0xC2, 0xD3, 0xE4, 0xF5, 0x06, 0x17, 0x28, 0x39, 0x4A, 0x5B, 0x6C, 0x7D, 0x8E, 0x9F]);
    ctx
}

fn message(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + 7) as u8).collect()
}

const STREAMING: [(Algorithm, Mode); 9] = [
    (Algorithm::Aes, Mode::Ctr),
    (Algorithm::Aes, Mode::Cfb),
    (Algorithm::Aes, Mode::Ofb),
    (Algorithm::Aes, Mode::Cfb8),
    (Algorithm::Twofish, Mode::Ctr),
    (Algorithm::Twofish, Mode::Cfb),
    (Algorithm::Des, Mode::Ofb),
    (Algorithm::TripleDes, Mode::Cfb),
    (Algorithm::Rc4, Mode::Stream),
];

#[test]
fn round_trip_every_length() {
    for algorithm in [Algorithm::Aes, Algorithm::Twofish, Algorithm::Des, Algorithm::TripleDes] {
        let bs = algorithm.block_size();
        for mode in [Mode::Ecb, Mode::Cbc, Mode::Ctr, Mode::Cfb, Mode::Cfb8, Mode::Ofb] {
            for padding in [true, false] {
                let mut ctx = context(algorithm, mode);
                if !padding {
                    ctx.disable_padding();
                }
                for len in 0..=4 * bs + 7 {
                    if mode.is_block_mode() && !padding && len % bs != 0 {
                        continue;
                    }
                    let plaintext = message(len);
                    let ciphertext = ctx.encrypt(&plaintext).unwrap();
                    if !mode.is_block_mode() {
                        assert_eq!(ciphertext.len(), len);
                    }
                    assert_eq!(
                        ctx.decrypt(&ciphertext).unwrap(),
                        plaintext,
                        "{algorithm}/{mode} padding={padding} len={len}"
                    );
                }
            }
        }
    }
}

#[test]
fn inner_cbc_round_trip() {
    let mut ctx = context(Algorithm::TripleDesInnerCbc, Mode::Cbc);
    for len in 0..40 {
        let plaintext = message(len);
        let ciphertext = ctx.encrypt(&plaintext).unwrap();
        assert_eq!(ciphertext.len(), (len / 8 + 1) * 8);
        assert_eq!(ctx.decrypt(&ciphertext).unwrap(), plaintext);
    }
}

#[test]
fn continuous_calls_equal_one_call() {
    for (algorithm, mode) in STREAMING {
        let plaintext = message(77);
        let whole = context(algorithm, mode).encrypt(&plaintext).unwrap();

        let mut ctx = context(algorithm, mode);
        ctx.enable_continuous_buffer();
        let mut pieces = Vec::new();
        for chunk in plaintext.chunks(13) {
            pieces.extend(ctx.encrypt(chunk).unwrap());
        }
        assert_eq!(pieces, whole, "{algorithm}/{mode}");

        let mut decrypted = Vec::new();
        for chunk in whole.chunks(5) {
            decrypted.extend(ctx.decrypt(chunk).unwrap());
        }
        assert_eq!(decrypted, plaintext, "{algorithm}/{mode}");
    }
}

#[test]
fn cbc_continuous_without_padding() {
    let a = message(16);
    let b: Vec<u8> = message(32)[16..].to_vec();
    let joined = [a.clone(), b.clone()].concat();

    let mut single = context(Algorithm::Aes, Mode::Cbc);
    single.disable_padding();
    let expected = single.encrypt(&joined).unwrap();

    let mut ctx = context(Algorithm::Aes, Mode::Cbc);
    ctx.disable_padding();
    ctx.enable_continuous_buffer();
    let mut streamed = ctx.encrypt(&a).unwrap();
    streamed.extend(ctx.encrypt(&b).unwrap());
    assert_eq!(streamed, expected);

    let mut plain = ctx.decrypt(&expected[..16]).unwrap();
    plain.extend(ctx.decrypt(&expected[16..]).unwrap());
    assert_eq!(plain, joined);
}

#[test]
fn without_continuous_buffer_each_call_restarts() {
    for (algorithm, mode) in STREAMING {
        let block = message(algorithm.block_size().max(8));
        let mut ctx = context(algorithm, mode);
        let first = ctx.encrypt(&block).unwrap();
        let second = ctx.encrypt(&block).unwrap();
        assert_eq!(first, second, "{algorithm}/{mode}");

        ctx.enable_continuous_buffer();
        let first = ctx.encrypt(&block).unwrap();
        let second = ctx.encrypt(&block).unwrap();
        assert_ne!(first, second, "{algorithm}/{mode}");
    }
}

#[test]
fn cfb_block_plus_three() {
    for algorithm in [Algorithm::Aes, Algorithm::Des] {
        let bs = algorithm.block_size();
        let plaintext = message(bs + 3);
        let whole = context(algorithm, Mode::Cfb).encrypt(&plaintext).unwrap();

        let mut ctx = context(algorithm, Mode::Cfb);
        ctx.enable_continuous_buffer();
        let mut split = ctx.encrypt(&plaintext[..bs]).unwrap();
        split.extend(ctx.encrypt(&plaintext[bs..]).unwrap());
        assert_eq!(split, whole);
    }
}

#[test]
fn directions_do_not_share_state() {
    let mut ctx = context(Algorithm::Aes, Mode::Ctr);
    ctx.enable_continuous_buffer();
    let plaintext = message(40);
    let c1 = ctx.encrypt(&plaintext[..20]).unwrap();
    let c2 = ctx.encrypt(&plaintext[20..]).unwrap();
    // decrypt starts from the IV regardless of how far encrypt has advanced
    assert_eq!(ctx.decrypt(&c1).unwrap(), &plaintext[..20]);
    assert_eq!(ctx.decrypt(&c2).unwrap(), &plaintext[20..]);
}

#[test]
fn disabling_continuous_buffer_rewinds() {
    let mut ctx = context(Algorithm::Twofish, Mode::Ofb);
    let plaintext = message(24);
    let fresh = ctx.encrypt(&plaintext).unwrap();
    ctx.enable_continuous_buffer();
    ctx.encrypt(&plaintext).unwrap();
    ctx.disable_continuous_buffer();
    assert_eq!(ctx.encrypt(&plaintext).unwrap(), fresh);
}

#[test]
fn set_iv_restarts_a_continuous_stream() {
    let mut ctx = context(Algorithm::Des, Mode::Cbc);
    ctx.enable_continuous_buffer();
    let first = ctx.encrypt(b"same text").unwrap();
    ctx.set_iv(&[0xA0, 0xB1, 0xC2, 0xD3, 0xE4, 0xF5, 0x06, 0x17]);
    assert_eq!(ctx.encrypt(b"same text").unwrap(), first);
}

#[test]
fn padding_always_adds_bytes() {
    let mut ctx = context(Algorithm::Aes, Mode::Ecb);
    let ciphertext = ctx.encrypt(&message(32)).unwrap();
    assert_eq!(ciphertext.len(), 48);
    assert_eq!(ctx.encrypt(&[]).unwrap().len(), 16);

    ctx.disable_padding();
    let last_block = ctx.decrypt(&ciphertext[32..]).unwrap();
    assert_eq!(last_block, vec![16u8; 16]);
}

#[test]
fn ecb_ignores_continuous_buffer() {
    let mut ctx = context(Algorithm::Aes, Mode::Ecb);
    let once = ctx.encrypt(b"block").unwrap();
    ctx.enable_continuous_buffer();
    assert_eq!(ctx.encrypt(b"block").unwrap(), once);
    assert_eq!(ctx.encrypt(b"block").unwrap(), once);
}

#[test]
fn corrupted_padding_is_an_error() {
    let mut ctx = context(Algorithm::Des, Mode::Cbc);
    let mut ciphertext = ctx.encrypt(b"attack at dawn").unwrap();
    let last = ciphertext.len() - 1;
    ciphertext[last] ^= 0x01;
    // the final block garbles; the pad byte is almost never valid
    match ctx.decrypt(&ciphertext) {
        Err(CipherModeError::InvalidPadding) => {}
        Ok(plaintext) => assert_ne!(plaintext, b"attack at dawn"),
        Err(other) => panic!("unexpected error {other}"),
    }
}
