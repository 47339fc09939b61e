// dkim-sign – DKIM signing of email messages
// Copyright © 2022–2023 David Bürgin <dbuergin@gluet.ch>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.

use dkim_sign::{DomainName, Selector, SignRequest, Signer};
use std::{env, process};
use tokio::{
    fs,
    io::{self, AsyncReadExt, AsyncWriteExt},
};

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut args = env::args();

    let (key_file, domain, selector) = match (
        args.next().as_deref(),
        args.next(),
        args.next(),
        args.next(),
        args.next(),
    ) {
        (_, Some(key_file), Some(domain), Some(selector), None) => (key_file, domain, selector),
        (program, ..) => {
            eprintln!("usage: {} <key_file> <domain> <selector>", program.unwrap_or("dkimsign"));
            process::exit(1);
        }
    };

    let key_file = fs::read(key_file).await.unwrap();
    let domain = DomainName::new(&domain).unwrap();
    let selector = Selector::new(&selector).unwrap();

    let request = SignRequest::new(domain, selector);

    let signer = Signer::from_pem(request, key_file).unwrap();

    let mut msg = vec![];
    let n = io::stdin().read_to_end(&mut msg).await.unwrap();
    assert!(n > 0, "empty message on stdin");

    match signer.sign(&msg) {
        Ok(signed) => {
            let mut stdout = io::stdout();
            stdout.write_all(&signed).await.unwrap();
            stdout.flush().await.unwrap();
        }
        Err(e) => {
            eprintln!("ERROR: {e} ({e:?})");
            process::exit(1);
        }
    }
}
